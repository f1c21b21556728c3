//! Shared utilities.

use tracing::info;

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

/// Compact human format for USD magnitudes, "-" when absent.
pub fn format_compact_usd(value: Option<f64>) -> String {
    let Some(value) = value else {
        return "-".to_string();
    };
    let abs = value.abs();
    if abs >= 1e9 {
        format!("${:.1}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("${:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("${:.1}K", value / 1e3)
    } else {
        format!("${value:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_usd_scales_by_magnitude() {
        assert_eq!(format_compact_usd(Some(12_400_000_000.0)), "$12.4B");
        assert_eq!(format_compact_usd(Some(5_600_000.0)), "$5.6M");
        assert_eq!(format_compact_usd(Some(78_000.0)), "$78.0K");
        assert_eq!(format_compact_usd(Some(950.0)), "$950");
    }

    #[test]
    fn compact_usd_handles_absent_and_negative() {
        assert_eq!(format_compact_usd(None), "-");
        assert_eq!(format_compact_usd(Some(-2_500_000.0)), "$-2.5M");
    }
}
