//! Parsers for adb shell and iperf output
//!
//! Every parser degrades to the `-1` / `-128` sentinels instead of failing;
//! callers treat those as "unknown" exactly like a disconnected radio.

use betocq_core::constants::{INVALID_INT, INVALID_RSSI};

/// Integer between the last `prefix` and the `postfix` that follows it
pub fn int_between_last(text: &str, prefix: &str, postfix: &str) -> i64 {
    let Some(left) = text.rfind(prefix) else {
        return INVALID_INT;
    };
    let rest = &text[left + prefix.len()..];
    match rest.find(postfix) {
        Some(right) => rest[..right].trim().parse().unwrap_or(INVALID_INT),
        None => INVALID_INT,
    }
}

/// STA frequency from `cmd wifi status | grep WifiInfo`
pub fn sta_frequency(wifi_status: &str) -> i64 {
    if wifi_status.trim().is_empty() {
        return INVALID_INT;
    }
    int_between_last(wifi_status, "Frequency:", "MHz")
}

/// Max supported TX link speed from `cmd wifi status | grep WifiInfo`
pub fn sta_max_link_speed(wifi_status: &str) -> i64 {
    if wifi_status.trim().is_empty() {
        return INVALID_INT;
    }
    int_between_last(wifi_status, "Max Supported Tx Link speed:", "Mbps")
}

/// Group-owner channel frequency from `dumpsys wifip2p`
pub fn p2p_frequency(dumpsys: &str) -> i64 {
    if dumpsys.trim().is_empty() {
        return INVALID_INT;
    }
    int_between_last(dumpsys, "channelFrequency=", ", groupRole=GroupOwner")
}

/// RSSI column of a `cmd wifi list-scan-results | grep <ssid>` line
pub fn scan_rssi(scan_line: &str) -> i32 {
    scan_line
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(2))
        .and_then(|rssi| rssi.trim().parse().ok())
        .unwrap_or(INVALID_RSSI)
}

/// Last iperf rate in KB/s, from the final "... Mbits/sec" figure
pub fn iperf_kbps(output: &str) -> Option<f64> {
    let idx = output.rfind("Mbits/sec")?;
    let mbps: f64 = output[..idx].split_whitespace().last()?.parse().ok()?;
    Some((mbps.trunc() * 1024.0 / 8.0).trunc())
}

/// Group owner address from `dumpsys wifip2p | egrep "groupOwnerAddress|groupOwnerIpAddress"`
pub fn group_owner_addr(dumpsys: &str) -> Option<String> {
    let addr = dumpsys.split_whitespace().last()?.replace('/', "");
    (!addr.is_empty()).then_some(addr)
}

/// Address between the last `postfix` and the `prefix` before it
fn substr_before_last(text: &str, prefix: &str, postfix: &str) -> Option<String> {
    let right = text.rfind(postfix)?;
    let left = text[..right].rfind(prefix)?;
    let value = text[left + prefix.len()..right].trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Interface address from an `ifconfig` block, IPv6 link-local preferred
pub fn ifconfig_addr(ifconfig: &str) -> Option<String> {
    substr_before_last(ifconfig, "inet6 addr:", "/64 Scope: Link")
        .or_else(|| substr_before_last(ifconfig, "inet addr:", "Bcast"))
}

/// First token of an `ifconfig` block
pub fn ifconfig_name(ifconfig: &str) -> Option<String> {
    ifconfig.split_whitespace().next().map(str::to_string)
}

/// WLAN interface name, `wlan1` taking precedence
pub fn wlan_ifname(ifconfig: &str) -> Option<&'static str> {
    if ifconfig.contains("wlan1") {
        Some("wlan1")
    } else if ifconfig.contains("wlan0") {
        Some("wlan0")
    } else {
        None
    }
}

/// Port from the snippet server's "SNIPPET SERVING, PORT <n>" line
pub fn snippet_serving_port(line: &str) -> Option<u16> {
    line.trim()
        .strip_prefix("SNIPPET SERVING, PORT ")
        .and_then(|port| port.trim().parse().ok())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const WIFI_STATUS: &str = "WifiInfo: SSID: \"ap-5g\", BSSID: 02:00:00:00:00:00, MAC: 02:00:00:00:00:00, \
        IP: /192.168.1.20, Security type: 2, Supplicant state: COMPLETED, Wi-Fi standard: 5, RSSI: -45, \
        Link speed: 866Mbps, Tx Link speed: 866Mbps, Max Supported Tx Link speed: 866Mbps, \
        Rx Link speed: 780Mbps, Max Supported Rx Link speed: 866Mbps, Frequency: 5180MHz, Net ID: 0";

    #[test]
    fn test_wifi_status_parsing() {
        assert_eq!(sta_frequency(WIFI_STATUS), 5180);
        assert_eq!(sta_max_link_speed(WIFI_STATUS), 866);
        assert_eq!(sta_frequency(""), INVALID_INT);
        assert_eq!(sta_frequency("Wifi is disabled"), INVALID_INT);
    }

    #[test]
    fn test_p2p_frequency_parsing() {
        let dump = "mGroup: network: DIRECT-xy\n isGO: true\n channelFrequency=5745, groupRole=GroupOwner\n";
        assert_eq!(p2p_frequency(dump), 5745);
        assert_eq!(p2p_frequency("mGroup: null"), INVALID_INT);
    }

    #[test]
    fn test_scan_rssi_parsing() {
        let line = "  a0:b1:c2:d3:e4:f5  5180  -52   1.2  ap-5g  [WPA2-PSK-CCMP][ESS]";
        assert_eq!(scan_rssi(line), -52);
        assert_eq!(scan_rssi(""), INVALID_RSSI);
    }

    #[test]
    fn test_iperf_output_parsing() {
        let out = "[  5]   0.00-10.00  sec   405 MBytes   340 Mbits/sec  receiver\n";
        assert_eq!(iperf_kbps(out), Some(43520.0));
        // Fractional rates are truncated before converting
        let out = "[  5] 0.00-10.00 sec 12 MBytes 10.9 Mbits/sec";
        assert_eq!(iperf_kbps(out), Some(1280.0));
        assert_eq!(iperf_kbps("iperf3: error - unable to connect"), None);
    }

    #[test]
    fn test_ifconfig_parsing() {
        let block = "p2p-wlan0-0 Link encap:UNSPEC\n  inet addr:192.168.49.1  Bcast:192.168.49.255  Mask:255.255.255.0\n";
        assert_eq!(ifconfig_addr(block).as_deref(), Some("192.168.49.1"));
        assert_eq!(ifconfig_name(block).as_deref(), Some("p2p-wlan0-0"));

        let v6 = "aware_data0 Link encap:UNSPEC\n  inet6 addr: fe80::1234/64 Scope: Link\n";
        assert_eq!(ifconfig_addr(v6).as_deref(), Some("fe80::1234"));
        assert_eq!(wlan_ifname("wlan0 Link\nwlan1 Link"), Some("wlan1"));
    }

    #[test]
    fn test_group_owner_addr() {
        assert_eq!(
            group_owner_addr("groupOwnerAddress: /192.168.49.1").as_deref(),
            Some("192.168.49.1")
        );
        assert_eq!(group_owner_addr(""), None);
    }

    #[test]
    fn test_serving_port_line() {
        assert_eq!(snippet_serving_port("SNIPPET SERVING, PORT 41235"), Some(41235));
        assert_eq!(snippet_serving_port("SNIPPET START, PROTOCOL 1 0"), None);
    }
}
