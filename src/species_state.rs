use serde::Serialize;

use crate::domain::CatalogPage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    InvalidName { message: String },
    NoResults,
    PageFailed { page: u32, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeciesState {
    Init,
    Validate,
    Paginate {
        next_page: u32,
        total_pages: Option<u32>,
    },
    Done,
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Fetched {
        num_pages: u32,
        num_recordings: u64,
        returned: usize,
    },
    Failed,
}

impl PageOutcome {
    pub fn from_page(page: &CatalogPage) -> Self {
        PageOutcome::Fetched {
            num_pages: page.num_pages,
            num_recordings: page.num_recordings,
            returned: page.recordings.len() + page.discarded,
        }
    }
}

impl SpeciesState {
    pub fn begin(self) -> Self {
        match self {
            SpeciesState::Init => SpeciesState::Validate,
            other => other,
        }
    }

    pub fn validated(self, result: Result<(), String>) -> Self {
        match (self, result) {
            (SpeciesState::Validate, Ok(())) => SpeciesState::Paginate {
                next_page: 1,
                total_pages: None,
            },
            (SpeciesState::Validate, Err(message)) => {
                SpeciesState::Skip(SkipReason::InvalidName { message })
            }
            (other, _) => other,
        }
    }

    /// Page totals are read from page 1 only; later pages cannot extend or
    /// shorten the run.
    pub fn after_page(self, outcome: PageOutcome, error: Option<String>) -> Self {
        let SpeciesState::Paginate {
            next_page,
            total_pages,
        } = self
        else {
            return self;
        };

        match outcome {
            PageOutcome::Failed => SpeciesState::Skip(SkipReason::PageFailed {
                page: next_page,
                error: error.unwrap_or_default(),
            }),
            PageOutcome::Fetched {
                num_pages,
                num_recordings,
                returned,
            } => {
                let total = match total_pages {
                    Some(total) => total,
                    None if num_recordings == 0 || returned == 0 => {
                        return SpeciesState::Skip(SkipReason::NoResults);
                    }
                    None => num_pages.max(1),
                };
                if next_page >= total {
                    SpeciesState::Done
                } else {
                    SpeciesState::Paginate {
                        next_page: next_page + 1,
                        total_pages: Some(total),
                    }
                }
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SpeciesState::Done | SpeciesState::Skip(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginating() -> SpeciesState {
        SpeciesState::Init.begin().validated(Ok(()))
    }

    #[test]
    fn invalid_name_skips() {
        let state = SpeciesState::Init
            .begin()
            .validated(Err("bad".to_string()));
        assert_eq!(
            state,
            SpeciesState::Skip(SkipReason::InvalidName {
                message: "bad".to_string()
            })
        );
    }

    #[test]
    fn single_page_finishes() {
        let state = paginating().after_page(
            PageOutcome::Fetched {
                num_pages: 1,
                num_recordings: 3,
                returned: 3,
            },
            None,
        );
        assert_eq!(state, SpeciesState::Done);
        assert!(state.is_terminal());
    }

    #[test]
    fn later_page_failure_skips() {
        let state = paginating()
            .after_page(
                PageOutcome::Fetched {
                    num_pages: 3,
                    num_recordings: 1200,
                    returned: 500,
                },
                None,
            )
            .after_page(PageOutcome::Failed, Some("timeout".to_string()));
        assert_eq!(
            state,
            SpeciesState::Skip(SkipReason::PageFailed {
                page: 2,
                error: "timeout".to_string()
            })
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn totals_come_from_first_page() {
        let state = paginating()
            .after_page(
                PageOutcome::Fetched {
                    num_pages: 2,
                    num_recordings: 600,
                    returned: 500,
                },
                None,
            )
            .after_page(
                PageOutcome::Fetched {
                    num_pages: 9,
                    num_recordings: 4000,
                    returned: 500,
                },
                None,
            );
        assert_eq!(state, SpeciesState::Done);
    }

    #[test]
    fn empty_first_page_means_no_results() {
        let state = paginating().after_page(
            PageOutcome::Fetched {
                num_pages: 0,
                num_recordings: 0,
                returned: 0,
            },
            None,
        );
        assert_eq!(state, SpeciesState::Skip(SkipReason::NoResults));
        assert!(!paginating().is_terminal());
    }
}
