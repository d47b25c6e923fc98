use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{Manager, ManagerAverage, ManagerId, ReportRow, Supervisor, SupervisorId};

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub rows: Vec<ReportRow>,
    /// Averages that matched no manager, or whose manager matched no supervisor.
    pub unresolved: usize,
}

/// Inner-joins averages with the manager and supervisor references and sorts
/// the result by ascending average. Duplicate reference ids fan out.
#[must_use]
pub fn join_references(
    averages: &[ManagerAverage],
    managers: &[Manager],
    supervisors: &[Supervisor],
) -> JoinOutcome {
    let mut managers_by_id: BTreeMap<ManagerId, Vec<&Manager>> = BTreeMap::new();
    for manager in managers {
        managers_by_id
            .entry(manager.manager_id)
            .or_default()
            .push(manager);
    }
    let mut supervisors_by_id: BTreeMap<SupervisorId, Vec<&Supervisor>> = BTreeMap::new();
    for supervisor in supervisors {
        supervisors_by_id
            .entry(supervisor.supervisor_id)
            .or_default()
            .push(supervisor);
    }

    let mut rows = Vec::new();
    let mut unresolved = 0;
    for average in averages {
        let before = rows.len();
        let matching_managers = managers_by_id.get(&average.manager_id).into_iter().flatten();
        for manager in matching_managers {
            let Some(supervisor_id) = manager.supervisor_id else {
                continue;
            };
            let matching_supervisors = supervisors_by_id.get(&supervisor_id).into_iter().flatten();
            for supervisor in matching_supervisors {
                rows.push(ReportRow {
                    supervisor_name: supervisor.supervisor_name.clone(),
                    manager_name: manager.manager_name.clone(),
                    avg_minutes: average.avg_minutes,
                    manager_id: average.manager_id,
                    supervisor_id,
                    reply_count: average.reply_count,
                });
            }
        }
        if rows.len() == before {
            unresolved += 1;
        }
    }

    sort_report_rows(&mut rows);
    JoinOutcome { rows, unresolved }
}

/// Ascending average; ties by supervisor name, manager name, manager id.
pub fn sort_report_rows(rows: &mut [ReportRow]) {
    rows.sort_by(compare_report_rows);
}

fn compare_report_rows(left: &ReportRow, right: &ReportRow) -> Ordering {
    left.avg_minutes
        .total_cmp(&right.avg_minutes)
        .then_with(|| left.supervisor_name.cmp(&right.supervisor_name))
        .then_with(|| left.manager_name.cmp(&right.manager_name))
        .then_with(|| left.manager_id.cmp(&right.manager_id))
}
