use super::{Primitive, TypeRef};

/// Provides the description of a type so it can be exported to the client.
/// Avoid implementing this trait yourself where possible and use the [`Reflect`](derive@crate::Reflect) macro instead.
pub trait Reflect {
    /// Returns a reference to this type as it should appear wherever it is used.
    fn reflect() -> TypeRef;
}

macro_rules! impl_primitives {
    ($($i:ident)+) => {$(
        impl Reflect for $i {
            fn reflect() -> TypeRef {
                TypeRef::Primitive(Primitive::$i)
            }
        }
    )+};
}

macro_rules! impl_tuple {
    ( impl $($i:ident),* ) => {
        impl<$($i: Reflect),*> Reflect for ($($i,)*) {
            fn reflect() -> TypeRef {
                TypeRef::Tuple(vec![$($i::reflect()),*])
            }
        }
    };
    ( $i2:ident $(, $i:ident)* ) => {
        impl_tuple!(impl $i2 $(, $i)* );
        impl_tuple!($($i),*);
    };
    () => {};
}

macro_rules! impl_containers {
    ($($container:ident)+) => {$(
        impl<T: Reflect + ?Sized> Reflect for $container<T> {
            fn reflect() -> TypeRef {
                T::reflect()
            }
        }
    )+}
}

macro_rules! impl_as {
    ($($ty:path as $tty:ident)+) => {$(
        impl Reflect for $ty {
            fn reflect() -> TypeRef {
                <$tty as Reflect>::reflect()
            }
        }
    )+};
}

macro_rules! impl_for_list {
    ($($ty:ident)+) => {$(
        impl<T: Reflect> Reflect for $ty<T> {
            fn reflect() -> TypeRef {
                TypeRef::List(Box::new(T::reflect()))
            }
        }
    )+};
}

macro_rules! impl_for_map {
    ($($ty:ident)+) => {$(
        impl<K: Reflect, V: Reflect> Reflect for $ty<K, V> {
            fn reflect() -> TypeRef {
                TypeRef::Map(Box::new((K::reflect(), V::reflect())))
            }
        }
    )+};
}

macro_rules! impl_unsupported {
    ($($ty:ident<$($g:ident),*> as $what:literal)+) => {$(
        impl<$($g),*> Reflect for $ty<$($g),*> {
            fn reflect() -> TypeRef {
                TypeRef::Unsupported($what)
            }
        }
    )+};
}

impl_primitives!(
    i8 i16 i32 i64 i128 isize
    u8 u16 u32 u64 u128 usize
    f32 f64
    bool char
    String
);

impl_tuple!(T1, T2, T3, T4, T5, T6);

impl Reflect for () {
    fn reflect() -> TypeRef {
        TypeRef::Primitive(Primitive::Unit)
    }
}

impl Reflect for str {
    fn reflect() -> TypeRef {
        String::reflect()
    }
}

impl<T: Reflect + ?Sized> Reflect for &T {
    fn reflect() -> TypeRef {
        T::reflect()
    }
}

impl<T: Reflect> Reflect for [T] {
    fn reflect() -> TypeRef {
        TypeRef::List(Box::new(T::reflect()))
    }
}

impl<const N: usize, T: Reflect> Reflect for [T; N] {
    fn reflect() -> TypeRef {
        TypeRef::List(Box::new(T::reflect()))
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn reflect() -> TypeRef {
        TypeRef::Optional(Box::new(T::reflect()))
    }
}

impl<T: Reflect + ToOwned + ?Sized> Reflect for std::borrow::Cow<'_, T> {
    fn reflect() -> TypeRef {
        T::reflect()
    }
}

impl Reflect for serde_json::Value {
    fn reflect() -> TypeRef {
        TypeRef::Primitive(Primitive::Any)
    }
}

const _: () = {
    use std::{rc::Rc, sync::Arc};
    impl_containers!(Box Rc Arc);
};

const _: () = {
    use std::collections::*;
    impl_for_list!(Vec VecDeque BinaryHeap LinkedList HashSet BTreeSet);
    impl_for_map!(HashMap BTreeMap);
};

const _: () = {
    use std::path::*;
    impl_as!(
        Path as String
        PathBuf as String
    );

    use std::net::*;
    impl_as!(
        IpAddr as String
        Ipv4Addr as String
        Ipv6Addr as String
        SocketAddr as String
    );

    use std::num::*;
    impl_as!(
        NonZeroU8 as u8
        NonZeroU16 as u16
        NonZeroU32 as u32
        NonZeroU64 as u64
        NonZeroUsize as usize
        NonZeroI8 as i8
        NonZeroI16 as i16
        NonZeroI32 as i32
        NonZeroI64 as i64
        NonZeroIsize as isize
    );
};

// Channels and functions only exist inside the process, they can never cross the wire.
const _: () = {
    use std::sync::mpsc::{Receiver, Sender, SyncSender};
    impl_unsupported!(
        Sender<T> as "channel (std::sync::mpsc::Sender)"
        SyncSender<T> as "channel (std::sync::mpsc::SyncSender)"
        Receiver<T> as "channel (std::sync::mpsc::Receiver)"
    );
};

const _: () = {
    use tokio::sync::mpsc::{Receiver, Sender, UnboundedReceiver, UnboundedSender};
    impl_unsupported!(
        Sender<T> as "channel (tokio::sync::mpsc::Sender)"
        Receiver<T> as "channel (tokio::sync::mpsc::Receiver)"
        UnboundedSender<T> as "channel (tokio::sync::mpsc::UnboundedSender)"
        UnboundedReceiver<T> as "channel (tokio::sync::mpsc::UnboundedReceiver)"
    );
};

const _: () = {
    use tokio::sync::oneshot::{Receiver, Sender};
    impl_unsupported!(
        Sender<T> as "channel (tokio::sync::oneshot::Sender)"
        Receiver<T> as "channel (tokio::sync::oneshot::Receiver)"
    );
};

macro_rules! impl_fn_pointers {
    ($($($arg:ident),* ;)+) => {$(
        impl<R, $($arg),*> Reflect for fn($($arg),*) -> R {
            fn reflect() -> TypeRef {
                TypeRef::Unsupported("function pointer")
            }
        }
    )+};
}

impl_fn_pointers!(
    ;
    A1;
    A1, A2;
    A1, A2, A3;
);
