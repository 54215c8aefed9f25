//! A simple CLI tool for checking published election results.
//! This uses the server's own aggregation engine, and so is by definition
//! compatible with the output of our dump endpoint.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use tally_backend::{
    model::{
        api::{dump::ElectionDump, results::ElectionResults},
        common::{CandidateId, CenterId},
    },
    tally::aggregate::recompute,
};

const PROGRAM_NAME: &str = "tally-cli";

const ABOUT_TEXT: &str = "Check the published totals of an election against its raw results.

EXIT CODES:
     0: Totals match.
   255: Ran successfully, but the totals do not match.
 Other: Error.";

const DUMP_PATH: &str = "DUMP_PATH";

const DUMP_PATH_HELP: &str = "The path to a JSON dump of a specific election,\n\
as returned by `GET /elections/<election_id>/dump`";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME).about(ABOUT_TEXT).arg(
        Arg::new(DUMP_PATH)
            .help(DUMP_PATH_HELP)
            .action(ArgAction::Set)
            .required(true),
    )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump.
    Format(String),
    /// The claimed aggregate differs from the recomputed one.
    Mismatch(Vec<Discrepancy>),
}

/// One way in which the claimed aggregate is wrong.
#[derive(Debug, Eq, PartialEq)]
enum Discrepancy {
    /// An election-wide counter is off.
    Counter {
        name: &'static str,
        claimed: u64,
        actual: u64,
    },
    /// A candidate's total is off, or the candidate should (not) be listed.
    Candidate {
        candidate_id: CandidateId,
        claimed: Option<u64>,
        actual: Option<u64>,
    },
    /// A center's subtotals are off, or the center should (not) be listed.
    Center { center_id: CenterId },
    /// The embedded election description was altered.
    Election,
}

impl Display for Discrepancy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Counter {
                name,
                claimed,
                actual,
            } => write!(f, "{name} is {claimed} but should be {actual}"),
            Self::Candidate {
                candidate_id,
                claimed,
                actual,
            } => match (claimed, actual) {
                (Some(claimed), Some(actual)) => write!(
                    f,
                    "candidate {candidate_id} has {claimed} votes but should have {actual}"
                ),
                (Some(claimed), None) => write!(
                    f,
                    "candidate {candidate_id} is credited {claimed} votes but has no results"
                ),
                (None, Some(actual)) => write!(
                    f,
                    "candidate {candidate_id} is missing but received {actual} votes"
                ),
                (None, None) => write!(f, "candidate {candidate_id} is inconsistent"),
            },
            Self::Center { center_id } => write!(f, "subtotals of center {center_id} are wrong"),
            Self::Election => write!(f, "the election description does not match"),
        }
    }
}

/// The final standing of one candidate.
#[derive(Debug, Eq, PartialEq)]
struct FriendlyResults {
    pub candidate_name: String,
    pub votes: u64,
}

impl Display for FriendlyResults {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} vote{}",
            self.candidate_name,
            self.votes,
            if self.votes != 1 { "s" } else { "" }
        )
    }
}

/// Every way in which `claimed` differs from `actual`.
fn compare(claimed: &ElectionResults, actual: &ElectionResults) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();
    if claimed.election != actual.election {
        discrepancies.push(Discrepancy::Election);
    }

    let counters = [
        ("total_voters", claimed.total_voters, actual.total_voters),
        ("blank_votes", claimed.blank_votes, actual.blank_votes),
        ("null_votes", claimed.null_votes, actual.null_votes),
    ];
    for (name, claimed, actual) in counters {
        if claimed != actual {
            discrepancies.push(Discrepancy::Counter {
                name,
                claimed,
                actual,
            });
        }
    }

    let candidate_ids: BTreeSet<CandidateId> = claimed
        .candidate_results
        .keys()
        .chain(actual.candidate_results.keys())
        .copied()
        .collect();
    for candidate_id in candidate_ids {
        let claimed = claimed.candidate_results.get(&candidate_id).copied();
        let actual = actual.candidate_results.get(&candidate_id).copied();
        if claimed != actual {
            discrepancies.push(Discrepancy::Candidate {
                candidate_id,
                claimed,
                actual,
            });
        }
    }

    let claimed_centers: BTreeMap<CenterId, _> = claimed
        .centers
        .iter()
        .map(|center| (center.center.id, center))
        .collect();
    let actual_centers: BTreeMap<CenterId, _> = actual
        .centers
        .iter()
        .map(|center| (center.center.id, center))
        .collect();
    let center_ids: BTreeSet<CenterId> = claimed_centers
        .keys()
        .chain(actual_centers.keys())
        .copied()
        .collect();
    for center_id in center_ids {
        if claimed_centers.get(&center_id) != actual_centers.get(&center_id) {
            discrepancies.push(Discrepancy::Center { center_id });
        }
    }

    discrepancies
}

/// Recompute the aggregate and check it.
fn check(path: &str) -> Result<Vec<FriendlyResults>, Error> {
    // Load the file.
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let dump: ElectionDump =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    // Recompute from the raw rows.
    let actual = recompute(&dump);
    let discrepancies = compare(&dump.aggregate, &actual);
    if !discrepancies.is_empty() {
        return Err(Error::Mismatch(discrepancies));
    }

    // Every candidate of the election is listed, including those without votes.
    let names: BTreeMap<CandidateId, String> = dump
        .candidates
        .iter()
        .map(|candidate| {
            let name = format!(
                "{} {} ({})",
                candidate.first_name, candidate.last_name, candidate.party
            );
            (candidate.id, name)
        })
        .collect();
    let mut results_list: Vec<FriendlyResults> = names
        .iter()
        .map(|(id, name)| FriendlyResults {
            candidate_name: name.clone(),
            votes: actual.candidate_results.get(id).copied().unwrap_or(0),
        })
        .collect();
    // Rows for candidates missing from the dump are still reported.
    for (id, votes) in &actual.candidate_results {
        if !names.contains_key(id) {
            results_list.push(FriendlyResults {
                candidate_name: format!("Unknown candidate {id}"),
                votes: *votes,
            });
        }
    }

    // Order by votes, then name.
    results_list.sort_unstable_by(|a, b| a.candidate_name.cmp(&b.candidate_name));
    results_list.sort_by(|a, b| b.votes.cmp(&a.votes));
    Ok(results_list)
}

/// Run the check, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(DUMP_PATH).unwrap(); // Required argument is guaranteed to be present.
    match check(path) {
        Ok(friendly_results) => {
            println!("Totals match.");
            for result in friendly_results {
                println!("{}", result);
            }
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {}", msg);
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {}", msg);
            1
        }
        Err(Error::Mismatch(discrepancies)) => {
            println!("Totals do not match:");
            for discrepancy in discrepancies {
                println!("  {}", discrepancy);
            }
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checking() {
        // This test actually enters backend code, so enable logging.
        log4rs_test_utils::test_logging::init_logging_once_for(["tally_backend"], None, None);

        let expected_results = vec![
            FriendlyResults {
                candidate_name: "Awa Ndong (UPN)".to_string(),
                votes: 80,
            },
            FriendlyResults {
                candidate_name: "Jean Mba (RDC)".to_string(),
                votes: 80,
            },
            FriendlyResults {
                candidate_name: "Paul Obame (IND)".to_string(),
                votes: 0,
            },
        ];
        assert_eq!(check("example_dumps/election.json"), Ok(expected_results));

        assert_eq!(check("example_dumps/election_empty.json"), Ok(Vec::new()));

        assert_eq!(
            check("example_dumps/election_invalid_totals.json"),
            Err(Error::Mismatch(vec![
                Discrepancy::Counter {
                    name: "null_votes",
                    claimed: 0,
                    actual: 3,
                },
                Discrepancy::Candidate {
                    candidate_id: 2,
                    claimed: Some(81),
                    actual: Some(80),
                },
                Discrepancy::Center { center_id: 1 },
            ]))
        );
    }

    #[test]
    fn correct_cli_usage() {
        let command_line = [PROGRAM_NAME, "example_dumps/election.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        let command_line = [PROGRAM_NAME, "example_dumps/election_invalid_totals.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 255);

        let command_line = [PROGRAM_NAME, "example_dumps/election_malformed.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);

        let command_line = [PROGRAM_NAME, "not a real file"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);
    }

    #[test]
    fn bad_cli_usage() {
        // Something very wrong.
        let command_line = [PROGRAM_NAME, "this", "invocation", "is", "incorrect"];
        cli().try_get_matches_from(command_line).unwrap_err();

        // No options at all.
        let command_line = [PROGRAM_NAME];
        cli().try_get_matches_from(command_line).unwrap_err();
    }
}
