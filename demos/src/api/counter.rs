use typed_rpc::{Atom, Router, RouterError};

use super::Counter;

pub fn mount() -> Result<Router, RouterError> {
    let counter = Atom::new(Counter::default());

    Router::new()
        .unary("Counter", "Increment", {
            let counter = counter.clone();
            move |by: i64| {
                let next = counter.update(|prev| Counter {
                    count: prev.count + by,
                });
                async move { Ok(next) }
            }
        })?
        .live("Counter", "Watch", move |_: ()| Ok(counter.subscribe()))
}
