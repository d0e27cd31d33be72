//! Row formatters for the watched Kubernetes kinds.

use chrono::{DateTime, TimeDelta, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kt_table::{Row, RowFormatter};

/// Age shown when an object has no creation timestamp.
pub const UNKNOWN_AGE: &str = "<unknown>";

/// Human age of a duration: `3d`, `5h`, `12m`, `40s`.
///
/// Anything negative (clock skew) reads as `0s`.
#[must_use]
pub fn age(elapsed: TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    if secs > 24 * 3600 {
        format!("{}d", secs / (24 * 3600))
    } else if secs > 3600 {
        format!("{}h", secs / 3600)
    } else if secs > 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

/// Age of an object created at `created`, as seen at `now`.
#[must_use]
pub fn format_age(created: Option<&Time>, now: DateTime<Utc>) -> String {
    created.map_or_else(|| UNKNOWN_AGE.to_string(), |time| age(now - time.0))
}

fn header(columns: &[&str]) -> Row {
    columns.iter().map(|c| (*c).to_string()).collect()
}

/// Formatter for `apps/v1` deployments.
///
/// Columns: `NAME DESIRED CURRENT UP-TO-DATE AVAILABLE AGE`.
#[derive(Debug, Clone, Default)]
pub struct DeploymentRows {
    now: Option<DateTime<Utc>>,
}

impl DeploymentRows {
    /// Formatter that computes ages against a fixed instant.
    #[must_use]
    pub const fn at(now: DateTime<Utc>) -> Self {
        Self { now: Some(now) }
    }
}

impl RowFormatter for DeploymentRows {
    type Resource = Deployment;

    fn header(&self) -> Row {
        header(&["NAME", "DESIRED", "CURRENT", "UP-TO-DATE", "AVAILABLE", "AGE"])
    }

    fn key(&self, resource: &Deployment) -> Option<String> {
        resource.metadata.name.clone().filter(|name| !name.is_empty())
    }

    fn format(&self, resource: &Deployment) -> Row {
        let desired = resource.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
        let status = resource.status.clone().unwrap_or_default();

        vec![
            resource.metadata.name.clone().unwrap_or_default(),
            desired.to_string(),
            status.replicas.unwrap_or(0).to_string(),
            status.updated_replicas.unwrap_or(0).to_string(),
            status.available_replicas.unwrap_or(0).to_string(),
            format_age(
                resource.metadata.creation_timestamp.as_ref(),
                self.now.unwrap_or_else(Utc::now),
            ),
        ]
    }
}

/// Formatter for `v1` pods.
///
/// Columns: `NAME READY STATUS RESTARTS AGE`. Ready counts containers
/// reporting ready out of all reported containers; restarts are summed over
/// containers. A pod being deleted shows as `Terminating`.
#[derive(Debug, Clone, Default)]
pub struct PodRows {
    now: Option<DateTime<Utc>>,
}

impl PodRows {
    /// Formatter that computes ages against a fixed instant.
    #[must_use]
    pub const fn at(now: DateTime<Utc>) -> Self {
        Self { now: Some(now) }
    }
}

impl RowFormatter for PodRows {
    type Resource = Pod;

    fn header(&self) -> Row {
        header(&["NAME", "READY", "STATUS", "RESTARTS", "AGE"])
    }

    fn key(&self, resource: &Pod) -> Option<String> {
        resource.metadata.name.clone().filter(|name| !name.is_empty())
    }

    fn format(&self, resource: &Pod) -> Row {
        let containers = resource
            .status
            .as_ref()
            .and_then(|s| s.container_statuses.as_deref())
            .unwrap_or_default();
        let ready = containers.iter().filter(|c| c.ready).count();
        let restarts: i64 = containers.iter().map(|c| i64::from(c.restart_count)).sum();

        let status = if resource.metadata.deletion_timestamp.is_some() {
            "Terminating".to_string()
        } else {
            resource
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_default()
        };

        vec![
            resource.metadata.name.clone().unwrap_or_default(),
            format!("{ready}/{}", containers.len()),
            status,
            restarts.to_string(),
            format_age(
                resource.metadata.creation_timestamp.as_ref(),
                self.now.unwrap_or_else(Utc::now),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStatus};
    use k8s_openapi::api::core::v1::{ContainerStatus, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use test_case::test_case;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    fn meta(name: &str, age_secs: i64) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            creation_timestamp: Some(Time(now() - TimeDelta::seconds(age_secs))),
            ..ObjectMeta::default()
        }
    }

    fn container(ready: bool, restarts: i32) -> ContainerStatus {
        ContainerStatus {
            ready,
            restart_count: restarts,
            ..ContainerStatus::default()
        }
    }

    #[test_case(0, "0s" ; "zero")]
    #[test_case(5, "5s" ; "seconds")]
    #[test_case(59, "59s" ; "just under a minute")]
    #[test_case(60, "60s" ; "exactly one minute stays in seconds")]
    #[test_case(61, "1m" ; "just over a minute")]
    #[test_case(3600, "60m" ; "exactly one hour stays in minutes")]
    #[test_case(3601, "1h" ; "just over an hour")]
    #[test_case(5 * 3600 + 59, "5h" ; "hours truncate")]
    #[test_case(24 * 3600, "24h" ; "exactly a day stays in hours")]
    #[test_case(3 * 24 * 3600 + 10, "3d" ; "days")]
    #[test_case(-30, "0s" ; "future timestamps")]
    fn age_formatting(secs: i64, expected: &str) {
        assert_eq!(age(TimeDelta::seconds(secs)), expected);
    }

    #[test]
    fn test_missing_creation_time() {
        assert_eq!(format_age(None, now()), UNKNOWN_AGE);
    }

    #[test]
    fn test_deployment_row() {
        let deployment = Deployment {
            metadata: meta("web", 90),
            spec: Some(DeploymentSpec {
                replicas: Some(3),
                ..DeploymentSpec::default()
            }),
            status: Some(DeploymentStatus {
                replicas: Some(3),
                updated_replicas: Some(2),
                available_replicas: Some(1),
                ..DeploymentStatus::default()
            }),
        };

        let rows = DeploymentRows::at(now());
        assert_eq!(rows.key(&deployment).as_deref(), Some("web"));
        assert_eq!(rows.format(&deployment), vec!["web", "3", "3", "2", "1", "1m"]);
        assert_eq!(rows.header().len(), rows.format(&deployment).len());
    }

    #[test]
    fn test_partial_deployment_uses_zero_values() {
        let deployment = Deployment {
            metadata: ObjectMeta {
                name: Some("bare".to_string()),
                ..ObjectMeta::default()
            },
            ..Deployment::default()
        };

        let rows = DeploymentRows::at(now());
        assert_eq!(
            rows.format(&deployment),
            vec!["bare", "0", "0", "0", "0", UNKNOWN_AGE]
        );
    }

    #[test]
    fn test_pod_row() {
        let pod = Pod {
            metadata: meta("api-7f9c", 5),
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                container_statuses: Some(vec![container(true, 1), container(false, 2)]),
                ..PodStatus::default()
            }),
            ..Pod::default()
        };

        let rows = PodRows::at(now());
        assert_eq!(rows.format(&pod), vec!["api-7f9c", "1/2", "Running", "3", "5s"]);
    }

    #[test]
    fn test_pending_pod_without_statuses() {
        let pod = Pod {
            metadata: meta("queued", 7200),
            status: Some(PodStatus {
                phase: Some("Pending".to_string()),
                ..PodStatus::default()
            }),
            ..Pod::default()
        };

        assert_eq!(
            PodRows::at(now()).format(&pod),
            vec!["queued", "0/0", "Pending", "0", "2h"]
        );
    }

    #[test]
    fn test_terminating_pod() {
        let mut pod = Pod {
            metadata: meta("old", 60),
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                ..PodStatus::default()
            }),
            ..Pod::default()
        };
        pod.metadata.deletion_timestamp = Some(Time(now()));

        assert_eq!(PodRows::at(now()).format(&pod)[2], "Terminating");
    }

    #[test]
    fn test_unnamed_objects_have_no_key() {
        let mut pod = Pod::default();
        assert!(PodRows::default().key(&pod).is_none());

        pod.metadata.name = Some(String::new());
        assert!(PodRows::default().key(&pod).is_none());
        assert!(DeploymentRows::default().key(&Deployment::default()).is_none());
    }
}
