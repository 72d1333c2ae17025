use super::*;
use pretty_assertions::assert_eq;

mod status_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_health_status_at_threshold_boundary() {
        assert_eq!(
            HealthStatus::from_latency(Duration::from_millis(100)),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::from_latency(Duration::from_millis(101)),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::from_latency(Duration::from_millis(500)),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::from_latency(Duration::from_millis(501)),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = HealthThresholds::new(50, 200);
        assert_eq!(
            HealthStatus::from_latency_with_thresholds(Duration::from_millis(30), &thresholds),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::from_latency_with_thresholds(Duration::from_millis(150), &thresholds),
            HealthStatus::Degraded
        );
    }

    #[test]
    fn test_degraded_never_below_healthy() {
        let thresholds = HealthThresholds::new(300, 100);
        assert_eq!(thresholds.degraded_threshold, Duration::from_millis(300));
    }
}

#[test]
fn test_healthy_serializes_latency_in_millis() {
    let healthy = Healthy {
        latency: Duration::from_millis(42),
        status: HealthStatus::Healthy,
    };
    assert_eq!(
        serde_json::to_value(healthy).unwrap(),
        serde_json::json!({"latency_ms": 42, "status": "healthy"})
    );
}
