//! Startup banner: the address other devices on the LAN should open, and an
//! optional terminal QR code for it.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use qrcode::{Color, QrCode};

/// Modules of light margin around the code; scanners need at least four.
const QUIET_ZONE: usize = 4;

/// Best guess at this machine's LAN address.
///
/// Connecting a UDP socket sends nothing; it only makes the OS pick the
/// outbound interface, whose address we then read back.
pub fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 168, 0, 1), 9)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

/// URL to advertise for a server bound to `host:port`.
///
/// Wildcard binds are replaced by `lan_ip` (or loopback when unknown).
pub fn share_url(host: &str, port: u16, lan_ip: Option<IpAddr>) -> String {
    let host = match host.parse::<IpAddr>() {
        Ok(ip) if ip.is_unspecified() => lan_ip.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        Ok(ip) => ip,
        Err(_) => return format!("http://{}:{}", host, port),
    };

    match host {
        IpAddr::V4(ip) => format!("http://{}:{}", ip, port),
        IpAddr::V6(ip) => format!("http://[{}]:{}", ip, port),
    }
}

/// Render `data` as a QR code made of Unicode half blocks.
///
/// Light modules are drawn as blocks and dark ones as blanks, which scans
/// well on the usual dark terminal background.
pub fn terminal_qr(data: &str) -> anyhow::Result<String> {
    let code = QrCode::new(data.as_bytes())?;
    let width = code.width();
    let modules = code.to_colors();
    let full = width + 2 * QUIET_ZONE;

    let is_light = |row: usize, col: usize| -> bool {
        if row < QUIET_ZONE || col < QUIET_ZONE {
            return true;
        }
        let (r, c) = (row - QUIET_ZONE, col - QUIET_ZONE);
        if r >= width || c >= width {
            return true;
        }
        modules[r * width + c] == Color::Light
    };

    let mut output = String::new();
    for row in (0..full).step_by(2) {
        for col in 0..full {
            let top = is_light(row, col);
            let bottom = row + 1 >= full || is_light(row + 1, col);
            output.push(match (top, bottom) {
                (true, true) => '\u{2588}',
                (true, false) => '\u{2580}',
                (false, true) => '\u{2584}',
                (false, false) => ' ',
            });
        }
        output.push('\n');
    }

    Ok(output)
}
