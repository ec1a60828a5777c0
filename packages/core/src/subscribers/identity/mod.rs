mod instantiator;
mod registrator;

pub use instantiator::InstantiatorSubscriber;
pub use registrator::RegistratorSubscriber;
