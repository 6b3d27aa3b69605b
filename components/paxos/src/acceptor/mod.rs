mod acceptor;

pub use acceptor::*;

#[cfg(test)]
mod test_acceptor;
