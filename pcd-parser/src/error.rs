use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse sensor metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid sensor metadata: {0}")]
    InvalidMetadata(String),

    #[error("unsupported lidar udp profile: {0}")]
    UnsupportedProfile(String),

    #[error("pcap parse error: {0}")]
    Pcap(String),
}
