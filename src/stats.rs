//! Pure statistics derivations over resource logs.
//!
//! These functions never feed back into scheduling and tolerate empty logs
//! by returning `0.0`. Time-weighted quantities are integrated between
//! consecutive status snapshots and normalized by the time of the last
//! snapshot. The `run*` methods of [`Environment`](crate::Environment) close
//! every status log with a snapshot at the final time, so after a run that
//! window is the whole run.

use itertools::Itertools;

use crate::resource::{QueueRecord, ResourceStatusRecord};

fn horizon(log: &[ResourceStatusRecord]) -> Option<f64> {
    match log.last() {
        Some(record) if record.time > 0.0 => Some(record.time),
        _ => None,
    }
}

fn time_weighted<F: Fn(&ResourceStatusRecord) -> f64>(
    log: &[ResourceStatusRecord],
    value: F,
) -> f64 {
    log.iter()
        .tuple_windows()
        .map(|(a, b)| value(a) * (b.time - a.time))
        .sum()
}

/// Fraction of owned units in use, averaged over time.
pub fn average_utilization(log: &[ResourceStatusRecord]) -> f64 {
    match horizon(log) {
        Some(total) => {
            let weighted = time_weighted(log, |record| {
                let in_use = f64::from(record.in_use);
                let idle = f64::from(record.idle);
                if in_use + idle > 0.0 {
                    in_use / (in_use + idle)
                } else {
                    0.0
                }
            });
            weighted / total
        }
        None => 0.0,
    }
}

/// Complement of [`average_utilization`].
pub fn average_idleness(log: &[ResourceStatusRecord]) -> f64 {
    1.0 - average_utilization(log)
}

/// Total time-weighted units in use.
pub fn total_time_in_use(log: &[ResourceStatusRecord]) -> f64 {
    time_weighted(log, |record| f64::from(record.in_use))
}

/// Total time-weighted units idle.
pub fn total_time_idle(log: &[ResourceStatusRecord]) -> f64 {
    time_weighted(log, |record| f64::from(record.idle))
}

/// Average number of idle units over the covered window.
pub fn average_level(log: &[ResourceStatusRecord]) -> f64 {
    match horizon(log) {
        Some(total) => total_time_idle(log) / total,
        None => 0.0,
    }
}

/// Average queue length: total waiting time divided by the covered window.
pub fn average_queue_length(queue_log: &[QueueRecord], status_log: &[ResourceStatusRecord]) -> f64 {
    match horizon(status_log) {
        Some(total) => {
            let waited: f64 = queue_log
                .iter()
                .map(|record| record.end_waiting - record.start_waiting)
                .sum();
            waited / total
        }
        None => 0.0,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::EntityId;
    use float_cmp::approx_eq;

    fn snapshot(time: f64, in_use: u32, idle: u32, queue_length: u32) -> ResourceStatusRecord {
        ResourceStatusRecord {
            time,
            in_use,
            idle,
            queue_length,
        }
    }

    #[test]
    fn test_empty_logs_yield_zero() {
        assert_eq!(average_utilization(&[]), 0.0);
        assert_eq!(average_queue_length(&[], &[]), 0.0);
        assert_eq!(total_time_in_use(&[]), 0.0);
        assert_eq!(average_level(&[]), 0.0);
    }

    #[test]
    fn test_average_utilization() {
        // Busy on [0, 6), idle on [6, 10).
        let log = vec![snapshot(0.0, 1, 0, 0), snapshot(6.0, 0, 1, 0), snapshot(10.0, 0, 1, 0)];
        assert!(approx_eq!(f64, average_utilization(&log), 0.6));
        assert!(approx_eq!(f64, average_idleness(&log), 0.4));
    }

    #[test]
    fn test_utilization_plus_idleness_is_one() {
        let log = vec![
            snapshot(0.0, 2, 1, 0),
            snapshot(4.0, 1, 2, 1),
            snapshot(9.0, 3, 0, 0),
            snapshot(12.0, 0, 3, 0),
        ];
        assert!(approx_eq!(
            f64,
            average_utilization(&log) + average_idleness(&log),
            1.0
        ));
    }

    #[test]
    fn test_totals() {
        let log = vec![snapshot(0.0, 2, 1, 0), snapshot(5.0, 1, 2, 0), snapshot(10.0, 1, 2, 0)];
        assert!(approx_eq!(f64, total_time_in_use(&log), 15.0));
        assert!(approx_eq!(f64, total_time_idle(&log), 15.0));
        assert!(approx_eq!(f64, average_level(&log), 1.5));
    }

    #[test]
    fn test_average_queue_length() {
        let queue = vec![
            QueueRecord {
                entity: EntityId::from(0),
                start_waiting: 0.0,
                end_waiting: 4.0,
                amount: 1,
            },
            QueueRecord {
                entity: EntityId::from(1),
                start_waiting: 2.0,
                end_waiting: 8.0,
                amount: 1,
            },
        ];
        let status = vec![snapshot(0.0, 0, 1, 2), snapshot(10.0, 0, 1, 0)];
        assert!(approx_eq!(f64, average_queue_length(&queue, &status), 1.0));
    }
}
