pub mod applier;
pub mod comparator;
pub mod matcher;
pub mod parser;
pub mod report;
pub mod verification;

pub use applier::ChangeApplier;
pub use comparator::{LinePool, VerificationListComparator};
pub use matcher::{Candidate, MatchOutcome, OrderNumberMatcher};
pub use verification::VerificationService;
