//! Shared data model for the sync engine and the query engine: the wire
//! record shapes for each data series, version/state tracking, and the
//! public result shapes returned by a query.

pub mod event;
pub mod kanji;
pub mod names;
pub mod radical;
pub mod result;
pub mod series;
pub mod state;
pub mod version;
pub mod words;

pub use event::{DownloadEvent, DownloadFileSpec, FileFormat, FileHeader, RecordMode};
pub use kanji::Kanji;
pub use names::Name;
pub use radical::Radical;
pub use result::{KanjiResult, MatchMode, MatchRange, NameResult, WordResult};
pub use series::{DataSeries, MajorDataSeries};
pub use state::{DataSeriesState, UpdateState};
pub use version::{DataVersion, PartInfo, VersionNumber};
pub use words::{Sense, Word};
