mod domain;
mod lookup;
mod posture;
mod query;
mod record;
mod report;
mod trace;

pub use domain::*;
pub use lookup::*;
pub use posture::*;
pub use query::*;
pub use record::*;
pub use report::*;
pub use trace::*;
