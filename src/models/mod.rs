pub mod changes;
pub mod order;
pub mod verification;

pub use changes::{
    ApplyChangesResult, ApprovedChangeSet, ChangeFailure, ChangeOp, ChangePlan, FailedChange,
};
pub use order::{OrderLine, OrderLineRow};
pub use verification::{
    DuplicateItem, ExcessItem, MatchConfidence, MatchedItem, MissingItem, MissingReason,
    NotFoundItem, NotFoundReason, ParsedOrderNumber, VerificationItemInput, VerificationResult,
    VerificationSummary,
};
