mod abstractions;
mod facade;

pub(crate) use abstractions::*;
pub(crate) use facade::*;

#[cfg(all(unix, not(miri)))]
mod unix;
#[cfg(all(unix, not(miri)))]
pub(crate) use unix::*;

#[cfg(any(miri, not(unix)))]
mod rust;
#[cfg(any(miri, not(unix)))]
pub(crate) use rust::*;
