//! Static registry of request/response patterns and their wire-form
//! renderers.
//!
//! Patterns are compiled once into immutable static tables keyed by
//! [`Verb`], rather than the reference implementation's mutable
//! file-scope singletons.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Every distinct wire-protocol verb the catalog recognizes.
///
/// Grouped by sub-controller. `PresetBand`/`PresetBandIncDec` are a
/// token family of their own rather than a reuse of the zone `EB`
/// tokens, since a preset has no zone id to key an `EB` argument off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    VolumeSet,
    VolumeIncDec,
    VolumeAll,
    Mute,
    ToggleMute,
    VolumeFixed,
    Balance,
    BalanceAdjust,
    Source,
    SourceAll,
    SoundMode,
    Tone,
    BassIncDec,
    TrebleIncDec,
    ZoneEqBand,
    ZoneEqBandIncDec,
    PresetEqSelect,
    Lowpass,
    Highpass,
    NameSet,
    GroupAdd,
    GroupRemove,
    GroupClear,
    GroupMute,
    GroupToggleMute,
    GroupVolumeSet,
    GroupVolumeIncDec,
    GroupSource,
    PresetBand,
    PresetBandIncDec,
    QueryZone,
    QueryZoneMute,
    QueryZoneSource,
    QueryZoneVolume,
    QueryGroup,
    QueryPreset,
    QueryFavorite,
    QueryCurrent,
    Save,
    Reset,
    Load,
    FrontPanelBrightness,
    FrontPanelLock,
    FrontPanelQuery,
    InfraredSet,
    InfraredQuery,
    NetworkQuery,
    NetworkDhcp,
    NetworkMac,
    NetworkHostIp,
    NetworkGateway,
    NetworkNetmask,
    NetworkSddp,
    Error,
}

/// Patterns in registration order. Order matters where one family's pattern is a
/// textual prefix of another's (`QF` vs `QF<id>`, `QE` vs `QE<id>`); both
/// are anchored so order is not strictly required for correctness here,
/// but is preserved to mirror how a real dispatcher would register them.
const PATTERN_TABLE: &[(Verb, &str)] = &[
    (Verb::VolumeSet, r"^VU(-?\d{1,3}),(\d{1,2})$"),
    (Verb::VolumeIncDec, r"^VU([UD]),(\d{1,2})$"),
    (Verb::VolumeAll, r"^VAU(-?\d{1,3})$"),
    (Verb::Mute, r"^([UM])U(\d{1,2})$"),
    (Verb::ToggleMute, r"^MT(\d{1,2})$"),
    (Verb::VolumeFixed, r"^VF(\d{1,2}),([01])$"),
    (Verb::Balance, r"^BP(\d{1,2}),([LR])(\d{1,2})$"),
    (Verb::BalanceAdjust, r"^BA(\d{1,2}),([LR])$"),
    (Verb::Source, r"^C(\d{1,2}),(\d{1,2})$"),
    (Verb::SourceAll, r"^CA(\d{1,2})$"),
    (Verb::SoundMode, r"^SM(\d{1,2}),(\d)$"),
    (Verb::Tone, r"^TO(\d{1,2}),(-?\d{1,2}),(-?\d{1,2})$"),
    (Verb::BassIncDec, r"^B([UD])(\d{1,2})$"),
    (Verb::TrebleIncDec, r"^T([UD])(\d{1,2})$"),
    (Verb::ZoneEqBand, r"^EB(\d{1,2}),(\d{1,2}),(-?\d{1,2})$"),
    (Verb::ZoneEqBandIncDec, r"^EB([UD])(\d{1,2}),(\d{1,2})$"),
    (Verb::PresetEqSelect, r"^EP(\d{1,2}),(\d{1,2})$"),
    (Verb::Lowpass, r"^LF(\d{1,2}),(\d{1,5})$"),
    (Verb::Highpass, r"^HF(\d{1,2}),(\d{1,5})$"),
    (Verb::NameSet, "^N([OZGEF])(\\d{1,2}),\"([^\"]*)\"$"),
    (Verb::GroupAdd, r"^G(\d{1,2}),\+(\d{1,2})$"),
    (Verb::GroupRemove, r"^G(\d{1,2}),-(\d{1,2})$"),
    (Verb::GroupClear, r"^GZC$"),
    (Verb::GroupMute, r"^G([UM])U(\d{1,2})$"),
    (Verb::GroupToggleMute, r"^GMT(\d{1,2})$"),
    (Verb::GroupVolumeSet, r"^GVU(-?\d{1,3}),(\d{1,2})$"),
    (Verb::GroupVolumeIncDec, r"^GVU([UD]),(\d{1,2})$"),
    (Verb::GroupSource, r"^GC(\d{1,2}),(\d{1,2})$"),
    (Verb::PresetBand, r"^PB(\d{1,2}),(\d{1,2}),(-?\d{1,2})$"),
    (Verb::PresetBandIncDec, r"^PB([UD])(\d{1,2}),(\d{1,2})$"),
    (Verb::QueryZone, r"^QZ(\d{1,2})$"),
    (Verb::QueryZoneMute, r"^QM(\d{1,2})$"),
    (Verb::QueryZoneSource, r"^QC(\d{1,2})$"),
    (Verb::QueryZoneVolume, r"^QV(\d{1,2})$"),
    (Verb::QueryGroup, r"^QG(\d{1,2})$"),
    (Verb::QueryPreset, r"^QE(\d{1,2})$"),
    (Verb::QueryFavorite, r"^QF(\d{1,2})$"),
    (Verb::QueryCurrent, r"^QX$"),
    (Verb::Save, r"^SX$"),
    (Verb::Reset, r"^RX$"),
    (Verb::Load, r"^LX$"),
    (Verb::FrontPanelBrightness, r"^FB(\d)$"),
    (Verb::FrontPanelLock, r"^FL([01])$"),
    (Verb::FrontPanelQuery, r"^QF$"),
    (Verb::InfraredSet, r"^IR([01])$"),
    (Verb::InfraredQuery, r"^QIR$"),
    (Verb::NetworkQuery, r"^QE$"),
    (Verb::NetworkDhcp, r"^DHCP([01])$"),
    (Verb::NetworkMac, r"^MAC([0-9A-Fa-f]{2}(?:-[0-9A-Fa-f]{2}){5})$"),
    (Verb::NetworkHostIp, r"^IP(.+)$"),
    (Verb::NetworkGateway, r"^GW(.+)$"),
    (Verb::NetworkNetmask, r"^NM(.+)$"),
    (Verb::NetworkSddp, r"^SDDP([01])$"),
    (Verb::Error, r"^ERROR$"),
];

fn compiled() -> &'static HashMap<Verb, Regex> {
    static TABLE: OnceLock<HashMap<Verb, Regex>> = OnceLock::new();
    TABLE.get_or_init(|| {
            PATTERN_TABLE
                .iter()
                .map(|&(verb, pattern)| {
                    (
                        verb,
                        Regex::new(pattern).expect("catalog pattern must compile"),
                    )
                })
                .collect()
        })
}

/// The result of matching an inbound frame body against the catalog.
pub struct Matched {
    pub verb: Verb,
    /// Positional captures, in pattern order, as owned strings.
    pub captures: Vec<String>,
}

/// Matches `body` against every pattern in registration order, returning
/// the first hit. `None` means no pattern recognized the
/// frame — the dispatcher's caller should emit `(ERROR)`.
pub fn recognize(body: &str) -> Option<Matched> {
    let table = compiled();
    for &(verb, _) in PATTERN_TABLE {
        let re = &table[&verb];
        if let Some(caps) = re.captures(body) {
            let captures = caps
                .iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect();
            return Some(Matched { verb, captures });
        }
    }
    None
}

/// Tests whether `body` matches the pattern registered for `verb`
/// specifically, without running the whole catalog. Used by the client's
/// exchange manager to check an inbound frame against the response
/// pattern it's currently expecting.
pub fn matches(verb: Verb, body: &str) -> Option<Vec<String>> {
    let table = compiled();
    table[&verb].captures(body).map(|caps| {
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect()
        })
}

// ─────────────────────────────────────────────────────────────────────────
// Renderers — produce the exact wire body for each verb.
// ─────────────────────────────────────────────────────────────────────────

pub fn render_volume_set(zone: u8, level: i8) -> String {
    format!("VU{level},{zone}")
}

pub fn render_volume_inc_dec(zone: u8, increase: bool) -> String {
    format!("VU{},{zone}", if increase { "U" } else { "D" })
}

pub fn render_volume_all(level: i8) -> String {
    format!("VAU{level}")
}

pub fn render_mute(zone: u8, mute: bool) -> String {
    format!("{}U{zone}", if mute { "M" } else { "U" })
}

pub fn render_toggle_mute(zone: u8) -> String {
    format!("MT{zone}")
}

pub fn render_volume_fixed(zone: u8, fixed: bool) -> String {
    format!("VF{zone},{}", fixed as u8)
}

pub fn render_balance(zone: u8, channel_tag: char, magnitude: i8) -> String {
    format!("BP{zone},{channel_tag}{magnitude}")
}

pub fn render_balance_adjust(zone: u8, channel_tag: char) -> String {
    format!("BA{zone},{channel_tag}")
}

pub fn render_source(zone: u8, src: u8) -> String {
    format!("C{zone},{src}")
}

pub fn render_source_all(src: u8) -> String {
    format!("CA{src}")
}

pub fn render_sound_mode(zone: u8, mode: u8) -> String {
    format!("SM{zone},{mode}")
}

pub fn render_tone(zone: u8, bass: i8, treble: i8) -> String {
    format!("TO{zone},{bass},{treble}")
}

pub fn render_bass_inc_dec(zone: u8, increase: bool) -> String {
    format!("B{}{zone}", if increase { "U" } else { "D" })
}

pub fn render_treble_inc_dec(zone: u8, increase: bool) -> String {
    format!("T{}{zone}", if increase { "U" } else { "D" })
}

pub fn render_zone_eq_band(zone: u8, band: u8, level: i8) -> String {
    format!("EB{zone},{band},{level}")
}

pub fn render_zone_eq_band_inc_dec(zone: u8, band: u8, increase: bool) -> String {
    format!("EB{}{zone},{band}", if increase { "U" } else { "D" })
}

pub fn render_preset_eq_select(zone: u8, preset: u8) -> String {
    format!("EP{zone},{preset}")
}

pub fn render_lowpass(zone: u8, hz: u16) -> String {
    format!("LF{zone},{hz}")
}

pub fn render_highpass(zone: u8, hz: u16) -> String {
    format!("HF{zone},{hz}")
}

pub fn render_name_set(kind: char, id: u8, name: &str) -> String {
    format!("N{kind}{id},\"{name}\"")
}

pub fn render_group_add(gid: u8, zid: u8) -> String {
    format!("G{gid},+{zid}")
}

pub fn render_group_remove(gid: u8, zid: u8) -> String {
    format!("G{gid},-{zid}")
}

pub fn render_group_clear() -> String {
    "GZC".to_string()
}

/// Group-targeted audio commands (`GroupsController.cpp`'s `MuteRequest`,
/// `SetVolumeRequest`, `SetSourceRequest` etc. define their own token family,
/// distinct from the zone one, since a bare zone pattern reused for a group
/// id would be ambiguous — see `SPEC_FULL.md` §2). Each mirrors its zone
/// counterpart's shape with the same `G` sigil already used by
/// add/remove/clear above.
pub fn render_group_mute(gid: u8, mute: bool) -> String {
    format!("{}U{gid}", if mute { "GM" } else { "GU" })
}

pub fn render_group_toggle_mute(gid: u8) -> String {
    format!("GMT{gid}")
}

pub fn render_group_volume_set(gid: u8, level: i8) -> String {
    format!("GVU{level},{gid}")
}

pub fn render_group_volume_inc_dec(gid: u8, increase: bool) -> String {
    format!("GVU{},{gid}", if increase { "U" } else { "D" })
}

pub fn render_group_source(gid: u8, src: u8) -> String {
    format!("GC{gid},{src}")
}

pub fn render_preset_band(preset: u8, band: u8, level: i8) -> String {
    format!("PB{preset},{band},{level}")
}

pub fn render_preset_band_inc_dec(preset: u8, band: u8, increase: bool) -> String {
    format!("PB{}{preset},{band}", if increase { "U" } else { "D" })
}

pub fn render_query_zone(id: u8) -> String {
    format!("QZ{id}")
}

pub fn render_query_zone_mute(id: u8) -> String {
    format!("QM{id}")
}

pub fn render_query_zone_source(id: u8) -> String {
    format!("QC{id}")
}

pub fn render_query_zone_volume(id: u8) -> String {
    format!("QV{id}")
}

pub fn render_query_group(id: u8) -> String {
    format!("QG{id}")
}

pub fn render_query_preset(id: u8) -> String {
    format!("QE{id}")
}

pub fn render_query_favorite(id: u8) -> String {
    format!("QF{id}")
}

pub fn render_query_current() -> String {
    "QX".to_string()
}

pub fn render_save() -> String {
    "SX".to_string()
}

pub fn render_reset() -> String {
    "RX".to_string()
}

pub fn render_load() -> String {
    "LX".to_string()
}

pub fn render_front_panel_brightness(level: u8) -> String {
    format!("FB{level}")
}

pub fn render_front_panel_lock(locked: bool) -> String {
    format!("FL{}", locked as u8)
}

pub fn render_front_panel_query() -> String {
    "QF".to_string()
}

pub fn render_infrared_set(disabled: bool) -> String {
    format!("IR{}", disabled as u8)
}

pub fn render_infrared_query() -> String {
    "QIR".to_string()
}

pub fn render_network_query() -> String {
    "QE".to_string()
}

pub fn render_network_dhcp(enabled: bool) -> String {
    format!("DHCP{}", enabled as u8)
}

/// `eui48` is the 6-byte hardware address; rendered dash-separated hex
/// (`TestNetworkControllerCommands.cpp`'s confirmed `MAC` token shape).
pub fn render_network_mac(eui48: &[u8; 6]) -> String {
    let hex: Vec<String> = eui48.iter().map(|b| format!("{b:02X}")).collect();
    format!("MAC{}", hex.join("-"))
}

pub fn render_network_host_ip(addr: &str) -> String {
    format!("IP{addr}")
}

pub fn render_network_gateway(addr: &str) -> String {
    format!("GW{addr}")
}

pub fn render_network_netmask(addr: &str) -> String {
    format!("NM{addr}")
}

pub fn render_network_sddp(enabled: bool) -> String {
    format!("SDDP{}", enabled as u8)
}

pub fn render_error() -> String {
    "ERROR".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_volume_set_and_extracts_captures() {
        let m = recognize("VU-40,3").unwrap();
        assert_eq!(m.verb, Verb::VolumeSet);
        assert_eq!(m.captures, vec!["-40", "3"]);
    }

    #[test]
    fn recognizes_unmute_from_scenario() {
        let m = recognize("UU1").unwrap();
        assert_eq!(m.verb, Verb::Mute);
        assert_eq!(m.captures, vec!["U", "1"]);
    }

    #[test]
    fn network_query_and_preset_query_do_not_collide() {
        let bare = recognize("QE").unwrap();
        assert_eq!(bare.verb, Verb::NetworkQuery);

        let with_id = recognize("QE3").unwrap();
        assert_eq!(with_id.verb, Verb::QueryPreset);
        assert_eq!(with_id.captures, vec!["3"]);
    }

    #[test]
    fn front_panel_query_and_favorite_query_do_not_collide() {
        assert_eq!(recognize("QF").unwrap().verb, Verb::FrontPanelQuery);
        assert_eq!(recognize("QF7").unwrap().verb, Verb::QueryFavorite);
    }

    #[test]
    fn group_add_remove_clear_are_distinct() {
        assert_eq!(recognize("G10,+3").unwrap().verb, Verb::GroupAdd);
        assert_eq!(recognize("G10,-3").unwrap().verb, Verb::GroupRemove);
        assert_eq!(recognize("GZC").unwrap().verb, Verb::GroupClear);
    }

    #[test]
    fn group_add_uses_each_captures_own_width() {
        //: a prior bug reused capture 1's length for capture 2.
        let m = recognize("G10,+3").unwrap();
        assert_eq!(m.captures, vec!["10", "3"]);
    }

    #[test]
    fn group_audio_commands_do_not_collide_with_zone_ones() {
        // group id 10 and zone id 10 share digits; the "G" sigil disambiguates.
        assert_eq!(recognize("GMU10").unwrap().verb, Verb::GroupMute);
        assert_eq!(recognize("MU10").unwrap().verb, Verb::Mute);
        assert_eq!(recognize("GVU-30,10").unwrap().verb, Verb::GroupVolumeSet);
        assert_eq!(recognize("VU-30,10").unwrap().verb, Verb::VolumeSet);
        assert_eq!(recognize("GVUU,10").unwrap().verb, Verb::GroupVolumeIncDec);
        assert_eq!(recognize("GC10,4").unwrap().verb, Verb::GroupSource);
        assert_eq!(recognize("GMT10").unwrap().verb, Verb::GroupToggleMute);
    }

    #[test]
    fn unrecognized_body_returns_none() {
        assert!(recognize("XYZ").is_none());
    }

    #[test]
    fn render_then_recognize_round_trips_for_every_family() {
        let cases = vec![
            (render_volume_set(3, -40), Verb::VolumeSet),
            (render_volume_inc_dec(3, true), Verb::VolumeIncDec),
            (render_volume_all(-10), Verb::VolumeAll),
            (render_mute(1, true), Verb::Mute),
            (render_toggle_mute(1), Verb::ToggleMute),
            (render_volume_fixed(1, true), Verb::VolumeFixed),
            (render_balance(5, 'L', 40), Verb::Balance),
            (render_balance_adjust(5, 'L'), Verb::BalanceAdjust),
            (render_source(2, 4), Verb::Source),
            (render_source_all(4), Verb::SourceAll),
            (render_sound_mode(2, 3), Verb::SoundMode),
            (render_tone(2, 1, 0), Verb::Tone),
            (render_bass_inc_dec(2, true), Verb::BassIncDec),
            (render_treble_inc_dec(2, true), Verb::TrebleIncDec),
            (render_zone_eq_band(3, 2, 5), Verb::ZoneEqBand),
            (render_zone_eq_band_inc_dec(3, 2, true), Verb::ZoneEqBandIncDec),
            (render_preset_eq_select(3, 2), Verb::PresetEqSelect),
            (render_lowpass(3, 120), Verb::Lowpass),
            (render_highpass(3, 80), Verb::Highpass),
            (render_name_set('Z', 3, "Den"), Verb::NameSet),
            (render_group_add(1, 3), Verb::GroupAdd),
            (render_group_remove(1, 3), Verb::GroupRemove),
            (render_group_clear(), Verb::GroupClear),
            (render_group_mute(2, true), Verb::GroupMute),
            (render_group_toggle_mute(2), Verb::GroupToggleMute),
            (render_group_volume_set(2, -30), Verb::GroupVolumeSet),
            (render_group_volume_inc_dec(2, true), Verb::GroupVolumeIncDec),
            (render_group_source(2, 4), Verb::GroupSource),
            (render_preset_band(2, 3, -4), Verb::PresetBand),
            (render_preset_band_inc_dec(2, 3, false), Verb::PresetBandIncDec),
            (render_query_zone(3), Verb::QueryZone),
            (render_query_zone_mute(3), Verb::QueryZoneMute),
            (render_query_zone_source(3), Verb::QueryZoneSource),
            (render_query_zone_volume(3), Verb::QueryZoneVolume),
            (render_query_group(1), Verb::QueryGroup),
            (render_query_preset(2), Verb::QueryPreset),
            (render_query_favorite(2), Verb::QueryFavorite),
            (render_query_current(), Verb::QueryCurrent),
            (render_save(), Verb::Save),
            (render_reset(), Verb::Reset),
            (render_load(), Verb::Load),
            (render_front_panel_brightness(2), Verb::FrontPanelBrightness),
            (render_front_panel_lock(true), Verb::FrontPanelLock),
            (render_front_panel_query(), Verb::FrontPanelQuery),
            (render_infrared_set(true), Verb::InfraredSet),
            (render_infrared_query(), Verb::InfraredQuery),
            (render_network_query(), Verb::NetworkQuery),
            (render_network_dhcp(true), Verb::NetworkDhcp),
            (render_network_mac(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]), Verb::NetworkMac),
            (render_network_host_ip("192.168.1.42"), Verb::NetworkHostIp),
            (render_network_gateway("192.168.1.1"), Verb::NetworkGateway),
            (render_network_netmask("255.255.255.0"), Verb::NetworkNetmask),
            (render_network_sddp(false), Verb::NetworkSddp),
            (render_error(), Verb::Error),
        ];
        for (body, expected_verb) in cases {
            let m = recognize(&body).unwrap_or_else(|| panic!("{body} failed to recognize"));
            assert_eq!(m.verb, expected_verb, "body was {body}");
        }
    }

    #[test]
    fn network_responses_use_distinct_prefixes() {
        assert_eq!(render_network_dhcp(true), "DHCP1");
        assert_eq!(render_network_sddp(false), "SDDP0");
        assert_eq!(
            render_network_mac(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
            "MAC00-11-22-33-44-55"
        );
        let dhcp = recognize("DHCP0").unwrap();
        assert_eq!(dhcp.verb, Verb::NetworkDhcp);
        assert_eq!(dhcp.captures, vec!["0"]);
        let ip = recognize("IP192.168.1.1").unwrap();
        assert_eq!(ip.verb, Verb::NetworkHostIp);
        assert_eq!(ip.captures, vec!["192.168.1.1"]);
    }

    #[test]
    fn balance_normalization_scenario() {
        assert_eq!(render_balance(5, 'L', 20), "BP5,L20");
        assert_eq!(render_balance(5, 'R', 0), "BP5,R0");
    }
}
