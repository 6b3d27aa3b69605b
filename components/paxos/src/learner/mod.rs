mod learner;

pub use learner::*;
