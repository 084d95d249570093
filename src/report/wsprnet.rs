//! wsprnet.org spot submission over plain HTTP GET.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;
use tracing::{debug, warn};

const WSPRNET_HOST: &str = "wsprnet.org:80";
const VERSION: &str = "0.2r_wsprd";

/// One accepted WSPR decode headed for wsprnet.
#[derive(Debug, Clone)]
pub struct WsprSpot {
    pub callsign: String,
    pub grid: String,
    pub power_dbm: i32,
    pub freq_hz: f64,
    pub snr_db: f32,
    pub delta_time: f32,
    pub drift: f32,
    pub date: String,
    pub time: String,
}

pub struct WsprNet {
    reporter_call: String,
    reporter_grid: String,
}

impl WsprNet {
    pub fn new(reporter_call: &str, reporter_grid: &str) -> WsprNet {
        WsprNet {
            reporter_call: reporter_call.to_string(),
            reporter_grid: reporter_grid.to_string(),
        }
    }

    /// Render the query path for a spot. Frequencies travel in MHz.
    fn query(&self, spot: &WsprSpot) -> String {
        let mhz = spot.freq_hz / 1e6;
        format!(
            "/post?function=wspr&rcall={}&rgrid={}&rqrg={:.6}&date={}&time={}&sig={:.0}&dt={:.1}&tqrg={:.6}&tcall={}&tgrid={}&dbm={}&version={}&mode=2",
            self.reporter_call,
            self.reporter_grid,
            mhz,
            spot.date,
            spot.time,
            spot.snr_db,
            spot.delta_time,
            mhz,
            spot.callsign,
            spot.grid,
            spot.power_dbm,
            VERSION,
        )
    }

    /// Submit one spot. Failures are logged and the spot dropped; the
    /// decode pipeline never blocks on the network.
    pub fn report_spot(&self, spot: &WsprSpot) {
        let query = self.query(spot);
        debug!("wsprnet query: {query}");
        if let Err(e) = self.send(&query) {
            warn!("wsprnet report failed: {e}");
        }
    }

    fn send(&self, query: &str) -> std::io::Result<()> {
        let mut stream = TcpStream::connect(WSPRNET_HOST)?;
        stream.set_read_timeout(Some(Duration::from_secs(10)))?;
        stream.set_write_timeout(Some(Duration::from_secs(10)))?;
        write!(
            stream,
            "GET {query} HTTP/1.1\r\nHost: wsprnet.org\r\nConnection: close\r\n\r\n"
        )?;
        let mut response = [0u8; 256];
        let got = stream.read(&mut response)?;
        debug!(
            "wsprnet answered: {}",
            String::from_utf8_lossy(&response[..got])
                .lines()
                .next()
                .unwrap_or("")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_layout() {
        let net = WsprNet::new("KG5YJE/P", "EM13");
        let spot = WsprSpot {
            callsign: "K1JT".to_string(),
            grid: "FN20".to_string(),
            power_dbm: 37,
            freq_hz: 14_097_100.0,
            snr_db: -19.0,
            delta_time: -0.3,
            drift: 0.0,
            date: "230615".to_string(),
            time: "1234".to_string(),
        };
        let query = net.query(&spot);
        assert_eq!(
            query,
            "/post?function=wspr&rcall=KG5YJE/P&rgrid=EM13&rqrg=14.097100&date=230615&time=1234&sig=-19&dt=-0.3&tqrg=14.097100&tcall=K1JT&tgrid=FN20&dbm=37&version=0.2r_wsprd&mode=2"
        );
    }
}
