mod backend;
mod error;
mod indexes;
mod params;
mod query_id;
mod registry;
mod variant;

pub use backend::{EmbeddedBackend, NormalizedBackend, QueryBackend};
pub use error::QueryError;
pub use indexes::{
    DropReport, IndexCreationWarning, IndexDropWarning, IndexManager, IndexReport, IndexSpec,
    index_set,
};
pub use params::{
    ActiveReviewersParams, ColdStartParams, HelpfulMoviesParams, LatestReviewsParams,
    MonthlyTrendParams, QueryParams, RatingDistributionParams, RatingRangeParams,
    TextSearchParams, TopRatedParams, UserRef, UserReviewsParams, parse_date,
};
pub use query_id::QueryId;
pub use registry::QueryRegistry;
pub use variant::{MOVIES_B, REVIEWS_A, REVIEWS_B, SchemaVariant, USERS_B};
