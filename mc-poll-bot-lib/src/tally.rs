use std::collections::HashSet;

/// A single voter's choice in a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Choice {
    Yes,
    No,
}

/// Vote counts for a poll at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TallyCounts {
    pub yes: usize,
    pub no: usize,
}

impl TallyCounts {
    /// Returns true if yes votes strictly outnumber no votes
    ///
    /// Ties fail, including a poll nobody voted in.
    pub fn passed(&self) -> bool {
        self.yes > self.no
    }
}

/// The yes and no voter sets of a single poll
///
/// A voter is present in at most one of the two sets at any time.
#[derive(Debug, Default, Clone)]
pub struct VoteTally {
    yes: HashSet<String>,
    no: HashSet<String>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `voter`'s current choice, replacing any earlier one
    pub fn cast_vote<S: Into<String>>(&mut self, voter: S, choice: Choice) {
        let voter = voter.into();
        self.yes.remove(&voter);
        self.no.remove(&voter);

        match choice {
            Choice::Yes => self.yes.insert(voter),
            Choice::No => self.no.insert(voter),
        };
    }

    /// The current choice of `voter`, if they have voted
    pub fn choice_of(&self, voter: &str) -> Option<Choice> {
        if self.yes.contains(voter) {
            Some(Choice::Yes)
        } else if self.no.contains(voter) {
            Some(Choice::No)
        } else {
            None
        }
    }

    pub fn counts(&self) -> TallyCounts {
        TallyCounts {
            yes: self.yes.len(),
            no: self.no.len(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Choice, TallyCounts, VoteTally};

    #[test]
    fn changing_vote_moves_voter() {
        let mut tally = VoteTally::new();
        let choices = [Choice::Yes, Choice::No, Choice::No, Choice::Yes, Choice::No];

        for choice in choices.iter().copied() {
            tally.cast_vote("alex", choice);

            assert_eq!(tally.choice_of("alex"), Some(choice));
            let counts = tally.counts();
            assert_eq!(counts.yes + counts.no, 1);
        }
    }

    #[test]
    fn repeated_vote_is_idempotent() {
        let mut tally = VoteTally::new();
        tally.cast_vote("alex", Choice::Yes);
        tally.cast_vote("sam", Choice::No);
        let before = tally.counts();

        tally.cast_vote("alex", Choice::Yes);
        assert_eq!(tally.counts(), before);
        assert_eq!(before, TallyCounts { yes: 1, no: 1 });
    }

    #[test]
    fn unknown_voter_has_no_choice() {
        let tally = VoteTally::new();
        assert_eq!(tally.choice_of("nobody"), None);
        assert_eq!(tally.counts(), TallyCounts::default());
    }

    #[test]
    fn strict_majority_passes() {
        assert!(TallyCounts { yes: 3, no: 2 }.passed());
        assert!(TallyCounts { yes: 1, no: 0 }.passed());
    }

    #[test]
    fn ties_fail() {
        assert!(!TallyCounts { yes: 2, no: 2 }.passed());
        assert!(!TallyCounts { yes: 0, no: 0 }.passed());
        assert!(!TallyCounts { yes: 1, no: 4 }.passed());
    }
}
