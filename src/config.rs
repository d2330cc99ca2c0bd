//! Configuration management for carrel

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

#[derive(Parser, Debug, Clone)]
#[command(name = "carrel")]
#[command(about = "Moderation and audit core for a student note-sharing platform")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "carrel")]
    pub mongodb_db: String,

    /// Enable development mode (falls back to the in-memory store when
    /// MongoDB is unreachable)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// How many audit records the live feed and audit listing carry
    #[arg(long, env = "AUDIT_FEED_LIMIT", default_value = "100")]
    pub audit_feed_limit: usize,

    /// How many notifications the live feed and notification listing carry
    #[arg(long, env = "NOTIFICATION_FEED_LIMIT", default_value = "20")]
    pub notification_feed_limit: usize,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.audit_feed_limit == 0 {
            return Err("AUDIT_FEED_LIMIT must be greater than zero".to_string());
        }
        if self.notification_feed_limit == 0 {
            return Err("NOTIFICATION_FEED_LIMIT must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let args = Args::parse_from(["carrel"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.audit_feed_limit, 100);
        assert_eq!(args.notification_feed_limit, 20);
    }

    #[test]
    fn zero_feed_limits_are_rejected() {
        let args = Args::parse_from(["carrel", "--audit-feed-limit", "0"]);
        assert!(args.validate().is_err());
    }
}
