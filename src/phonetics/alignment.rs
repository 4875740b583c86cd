//! Minimum-edit alignment of target and response phonemes

use serde::{Deserialize, Serialize};

/// How one aligned position relates target to response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Match,
    Substitution,
    /// A phoneme heard that was not in the target
    Insertion,
    /// A target phoneme that was not heard
    Deletion,
}

/// One position of an alignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedPhoneme {
    pub target: Option<String>,
    pub response: Option<String>,
    pub kind: EditKind,
}

/// Align two phoneme sequences with unit edit costs
///
/// Among alignments of equal cost, a diagonal step (match or substitution) is
/// preferred over a deletion, and a deletion over an insertion.
pub fn align(target: &[&str], response: &[&str]) -> Vec<AlignedPhoneme> {
    let (m, n) = (target.len(), response.len());

    let mut cost = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in cost.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        cost[0][j] = j;
    }
    for i in 1..=m {
        for j in 1..=n {
            let diagonal = cost[i - 1][j - 1] + usize::from(target[i - 1] != response[j - 1]);
            cost[i][j] = diagonal.min(cost[i - 1][j] + 1).min(cost[i][j - 1] + 1);
        }
    }

    let mut aligned = Vec::with_capacity(m.max(n));
    let (mut i, mut j) = (m, n);
    while i > 0 || j > 0 {
        let step = if i > 0 && j > 0 {
            let same = target[i - 1] == response[j - 1];
            if cost[i][j] == cost[i - 1][j - 1] + usize::from(!same) {
                if same {
                    EditKind::Match
                } else {
                    EditKind::Substitution
                }
            } else if cost[i][j] == cost[i - 1][j] + 1 {
                EditKind::Deletion
            } else {
                EditKind::Insertion
            }
        } else if i > 0 {
            EditKind::Deletion
        } else {
            EditKind::Insertion
        };

        let (t, r) = match step {
            EditKind::Match | EditKind::Substitution => {
                i -= 1;
                j -= 1;
                (Some(target[i]), Some(response[j]))
            }
            EditKind::Deletion => {
                i -= 1;
                (Some(target[i]), None)
            }
            EditKind::Insertion => {
                j -= 1;
                (None, Some(response[j]))
            }
        };
        aligned.push(AlignedPhoneme {
            target: t.map(str::to_string),
            response: r.map(str::to_string),
            kind: step,
        });
    }

    aligned.reverse();
    aligned
}
