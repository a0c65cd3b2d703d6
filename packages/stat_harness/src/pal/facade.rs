use std::fmt::{self, Debug};
use std::num::NonZero;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::MockTickSource;
use crate::pal::{PLATFORM_TICK_SOURCE, PlatformTickSource, TickSource};

#[derive(Clone)]
pub(crate) enum TickSourceFacade {
    Real(&'static PlatformTickSource),

    #[cfg(test)]
    Mock(Arc<MockTickSource>),
}

impl TickSourceFacade {
    pub(crate) fn real() -> Self {
        Self::Real(&PLATFORM_TICK_SOURCE)
    }
}

#[cfg(test)]
impl From<MockTickSource> for TickSourceFacade {
    fn from(source: MockTickSource) -> Self {
        Self::Mock(Arc::new(source))
    }
}

impl TickSource for TickSourceFacade {
    fn now(&self) -> u64 {
        match self {
            Self::Real(source) => source.now(),
            #[cfg(test)]
            Self::Mock(source) => source.now(),
        }
    }

    fn frequency(&self) -> NonZero<u64> {
        match self {
            Self::Real(source) => source.frequency(),
            #[cfg(test)]
            Self::Mock(source) => source.frequency(),
        }
    }

    fn resolution(&self) -> u64 {
        match self {
            Self::Real(source) => source.resolution(),
            #[cfg(test)]
            Self::Mock(source) => source.resolution(),
        }
    }
}

impl Debug for TickSourceFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(source) => source.fmt(f),
            #[cfg(test)]
            Self::Mock(source) => source.fmt(f),
        }
    }
}
