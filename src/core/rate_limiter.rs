use std::time::Duration;
use tokio::time::sleep;
use rand::Rng;
use tracing::debug;

pub struct RateLimiter;

impl RateLimiter {
    /// Delay to apply before hitting a remote source.
    pub fn delay_for(source: &str) -> Duration {
        match source.to_uppercase().as_str() {
            "BCRA" => {
                // Public API without published quota, keep requests spaced with jitter
                let millis = {
                    let mut rng = rand::thread_rng();
                    rng.gen_range(300..800)
                };
                Duration::from_millis(millis)
            }
            "LOCAL" => Duration::ZERO,
            _ => Duration::from_millis(100),
        }
    }

    /// Wait appropriate duration based on the data source
    pub async fn wait(source: &str) {
        let delay = Self::delay_for(source);
        if !delay.is_zero() {
            debug!("Throttling {} request for {:?}", source, delay);
            sleep(delay).await;
        }
    }
}
