//! Shell command lines run on the servers.
//!
//! Interface names are validated at config load and addresses are typed, so
//! nothing interpolated here needs quoting.

use std::net::IpAddr;

use crate::node::ServerNode;
use crate::remote::executor::AliasState;

fn family(ip: IpAddr) -> (&'static str, u8) {
    match ip {
        IpAddr::V4(_) => ("inet", 32),
        IpAddr::V6(_) => ("inet6", 128),
    }
}

/// `grep` needle matching the address in `ip -o addr` output.
fn needle(ip: IpAddr) -> String {
    let (family, _) = family(ip);
    format!("{} {}/", family, ip)
}

/// Add the address to the alias unless already present, then announce it.
pub fn bring_up(server: &ServerNode, ip: IpAddr) -> String {
    let dev = server.device();
    let (_, prefix) = family(ip);
    let add = match ip {
        IpAddr::V4(_) => format!(
            "ip addr add {ip}/{prefix} dev {dev} label {label}",
            label = server.failover_eth
        ),
        IpAddr::V6(_) => format!("ip addr add {ip}/{prefix} dev {dev}"),
    };
    let announce = match ip {
        IpAddr::V4(_) => format!("(arping -q -U -c 3 -I {dev} {ip} >/dev/null 2>&1 || true)"),
        IpAddr::V6(_) => "true".to_string(),
    };
    format!(
        "(ip -o addr show dev {dev} | grep -qF '{needle}' || {add}) && {announce}",
        needle = needle(ip)
    )
}

/// Remove the address from the device if present.
pub fn bring_down(server: &ServerNode, ip: IpAddr) -> String {
    let dev = server.device();
    let (_, prefix) = family(ip);
    format!(
        "! ip -o addr show dev {dev} | grep -qF '{needle}' || ip addr del {ip}/{prefix} dev {dev}",
        needle = needle(ip)
    )
}

/// List the device's addresses.
pub fn query_state(server: &ServerNode) -> String {
    format!("ip -o addr show dev {}", server.device())
}

/// Interpret the output of [`query_state`].
pub fn parse_state(stdout: &str, ip: IpAddr) -> AliasState {
    let needle = needle(ip);
    if stdout.lines().any(|line| line.contains(&needle)) {
        AliasState::Present
    } else {
        AliasState::Absent
    }
}

/// Trace toward `target` and print a JSON report.
pub fn mtr_report(target: IpAddr, cycles: u32) -> String {
    format!("mtr --report --json --no-dns --report-cycles {} {}", cycles, target)
}
