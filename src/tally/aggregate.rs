use std::collections::{BTreeMap, HashMap};

use crate::model::{
    api::{
        center::CenterDescription,
        dump::ElectionDump,
        election::ElectionDescription,
        office::OfficeDescription,
        results::{CenterTotals, ElectionResults, Subtotals},
        tally::VotingResultDescription,
    },
    common::{CenterId, OfficeId},
};

/// Fold an election's offices and result rows into its aggregate.
///
/// Office counters are summed into their center's subtotal and into the
/// election total; result rows are summed per candidate. Offices whose center
/// is not listed, and rows whose office is not counted, are ignored. The
/// workflow status of an office does not affect whether it is counted.
///
/// The output does not depend on input order: centers are reported by
/// ascending ID.
pub fn aggregate(
    election: ElectionDescription,
    centers: &[CenterDescription],
    offices: &[OfficeDescription],
    results: &[VotingResultDescription],
) -> ElectionResults {
    let mut subtotals: BTreeMap<CenterId, (CenterDescription, Subtotals)> = centers
        .iter()
        .filter(|center| center.election_id == election.id)
        .map(|center| (center.id, (center.clone(), Subtotals::default())))
        .collect();

    let mut counted: HashMap<OfficeId, CenterId> = HashMap::new();
    for office in offices {
        if let Some((_, center_subtotals)) = subtotals.get_mut(&office.center_id) {
            // An office listed twice is only counted once.
            if counted.insert(office.id, office.center_id).is_none() {
                center_subtotals.add(office.total_voters, office.blank_votes, office.null_votes);
            }
        }
    }

    let mut candidate_results = BTreeMap::new();
    for result in results {
        if counted.contains_key(&result.office_id) {
            *candidate_results.entry(result.candidate_id).or_insert(0) += u64::from(result.votes);
        }
    }

    let mut total = Subtotals::default();
    let centers = subtotals
        .into_values()
        .map(|(center, subtotals)| {
            total += subtotals;
            CenterTotals { center, subtotals }
        })
        .collect();

    ElectionResults {
        election,
        total_voters: total.total_voters,
        blank_votes: total.blank_votes,
        null_votes: total.null_votes,
        candidate_results,
        centers,
    }
}

/// Recompute the aggregate of a dumped election from its raw contents.
pub fn recompute(dump: &ElectionDump) -> ElectionResults {
    aggregate(
        dump.election.clone(),
        &dump.centers,
        &dump.offices,
        &dump.results,
    )
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    use crate::model::common::office::SubmissionStatus;

    fn two_offices() -> (Vec<CenterDescription>, Vec<OfficeDescription>, Vec<VotingResultDescription>) {
        let centers = vec![center(1)];
        let offices = vec![
            office(1, 1, (Some(100), Some(5), Some(3))),
            office(2, 1, (Some(80), Some(2), Some(1))),
        ];
        let results = vec![row(1, 1, 50), row(1, 2, 42), row(2, 1, 30), row(2, 2, 38)];
        (centers, offices, results)
    }

    #[test]
    fn additive() {
        let (centers, offices, results) = two_offices();
        let aggregate = aggregate(election(), &centers, &offices, &results);

        assert_eq!(aggregate.total_voters, 180);
        assert_eq!(aggregate.blank_votes, 7);
        assert_eq!(aggregate.null_votes, 4);
        assert_eq!(aggregate.candidate_results, BTreeMap::from([(1, 80), (2, 80)]));
        assert_eq!(aggregate.centers.len(), 1);
        assert_eq!(aggregate.centers[0].subtotals.total_voters, 180);
        assert_eq!(aggregate.centers[0].center.id, 1);
    }

    #[test]
    fn additive_across_centers() {
        let centers = vec![center(1), center(2)];
        let offices = vec![
            office(1, 1, (Some(100), Some(4), Some(6))),
            office(2, 2, (Some(80), Some(5), Some(5))),
        ];
        let results = vec![row(1, 1, 60), row(1, 2, 30), row(2, 1, 20), row(2, 2, 50)];
        let aggregate = aggregate(election(), &centers, &offices, &results);

        assert_eq!(aggregate.total_voters, 180);
        assert_eq!(aggregate.blank_votes, 9);
        assert_eq!(aggregate.null_votes, 11);
        assert_eq!(aggregate.candidate_results, BTreeMap::from([(1, 80), (2, 80)]));

        let subtotals: Vec<(CenterId, Subtotals)> = aggregate
            .centers
            .iter()
            .map(|center| (center.center.id, center.subtotals))
            .collect();
        assert_eq!(
            subtotals,
            vec![
                (
                    1,
                    Subtotals {
                        total_voters: 100,
                        blank_votes: 4,
                        null_votes: 6,
                    }
                ),
                (
                    2,
                    Subtotals {
                        total_voters: 80,
                        blank_votes: 5,
                        null_votes: 5,
                    }
                ),
            ]
        );
    }

    #[test]
    fn order_independent() {
        let (mut centers, mut offices, mut results) = two_offices();
        centers.push(center(2));
        offices.push(office(3, 2, (Some(10), None, None)));
        results.push(row(3, 3, 9));
        let election = election();
        let expected = aggregate(election.clone(), &centers, &offices, &results);

        centers.reverse();
        offices.reverse();
        results.rotate_left(2);
        let reordered = aggregate(election.clone(), &centers, &offices, &results);
        assert_eq!(reordered, expected);

        // Repeated reads of the same data give the same answer.
        assert_eq!(aggregate(election, &centers, &offices, &results), expected);
    }

    #[test]
    fn no_centers() {
        let aggregate = aggregate(election(), &[], &[], &[]);
        assert_eq!(aggregate.total_voters, 0);
        assert_eq!(aggregate.blank_votes, 0);
        assert_eq!(aggregate.null_votes, 0);
        assert!(aggregate.candidate_results.is_empty());
        assert!(aggregate.centers.is_empty());
    }

    #[test]
    fn missing_counters_count_as_zero() {
        let centers = vec![center(1), center(2)];
        let offices = vec![office(1, 1, (None, None, None)), office(2, 2, (Some(12), None, Some(1)))];
        let aggregate = aggregate(election(), &centers, &offices, &[]);
        assert_eq!(aggregate.total_voters, 12);
        assert_eq!(aggregate.null_votes, 1);
        assert_eq!(aggregate.centers[0].subtotals, Subtotals::default());
        assert!(aggregate.candidate_results.is_empty());
    }

    #[test]
    fn candidates_without_rows_absent() {
        let (centers, offices, _) = two_offices();
        let results = vec![row(1, 2, 7)];
        let aggregate = aggregate(election(), &centers, &offices, &results);
        assert_eq!(aggregate.candidate_results, BTreeMap::from([(2, 7)]));
    }

    #[test]
    fn ignores_foreign_rows() {
        let (centers, mut offices, mut results) = two_offices();
        // An office of a center from another election, and a row of an unknown office.
        offices.push(office(9, 42, (Some(1000), None, None)));
        results.push(row(9, 1, 1000));
        results.push(row(77, 1, 1000));
        let aggregate = aggregate(election(), &centers, &offices, &results);
        assert_eq!(aggregate.total_voters, 180);
        assert_eq!(aggregate.candidate_results[&1], 80);
    }

    #[test]
    fn workflow_status_not_filtered() {
        let (centers, mut offices, results) = two_offices();
        offices[0].submission_status = SubmissionStatus::Draft;
        offices[1].submission_status = SubmissionStatus::Rejected;
        let aggregate = aggregate(election(), &centers, &offices, &results);
        assert_eq!(aggregate.total_voters, 180);
    }

    #[test]
    fn large_totals_do_not_overflow() {
        let centers = vec![center(1)];
        let offices = vec![
            office(1, 1, (Some(u32::MAX), None, None)),
            office(2, 1, (Some(u32::MAX), None, None)),
        ];
        let results = vec![row(1, 1, u32::MAX), row(2, 1, u32::MAX)];
        let aggregate = aggregate(election(), &centers, &offices, &results);
        assert_eq!(aggregate.total_voters, 2 * u64::from(u32::MAX));
        assert_eq!(aggregate.candidate_results[&1], 2 * u64::from(u32::MAX));
    }
}
