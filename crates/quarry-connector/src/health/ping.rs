use quarry_core::{Connection, QuarryError, Result};
use std::time::{Duration, Instant};

/// Run the driver's ping query and return its round-trip time
pub async fn ping(conn: &dyn Connection) -> Result<Duration> {
    if conn.is_closed() {
        return Err(QuarryError::Connection("connection is closed".into()));
    }

    let start = Instant::now();
    conn.query(conn.ping_query(), &[]).await?;
    Ok(start.elapsed())
}
