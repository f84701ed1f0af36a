pub mod angles;
pub mod spring;

pub use angles::AngleHelper;
pub use spring::CriticallyDampedSpring;
