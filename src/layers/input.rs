//! Externally fed layers
//!
//! An input layer is filled by a caller-supplied function from a value of
//! the type it was built for. The type is erased so that inputs of
//! different types can live in the same network, and recovered with a
//! checked downcast on every fill.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;

use crate::layers::LayerId;

/// Boxed fill function for inputs of type `T`.
pub type Filler<T> = Box<dyn Fn(&mut [f64], &T)>;

/// Type-erased fill function of an input layer.
pub struct InputLayer {
    filler: Box<dyn Any>,
    type_name: &'static str,
}

impl InputLayer {
    pub fn new<T, F>(filler: F) -> Self
    where
        T: 'static,
        F: Fn(&mut [f64], &T) + 'static,
    {
        let boxed: Filler<T> = Box::new(filler);
        Self {
            filler: Box::new(boxed),
            type_name: type_name::<T>(),
        }
    }

    /// Name of the type this layer is fed with.
    pub fn input_type(&self) -> &'static str {
        self.type_name
    }

    /// Whether the layer was built for inputs of type `T`.
    pub fn accepts<T: 'static>(&self) -> bool {
        self.filler.is::<Filler<T>>()
    }

    /// Run the fill function over `values`. Returns `false`, leaving
    /// `values` untouched, if the layer was built for another type.
    pub(crate) fn fill<T: 'static>(&self, values: &mut [f64], input: &T) -> bool {
        match self.filler.downcast_ref::<Filler<T>>() {
            Some(filler) => {
                filler(values, input);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for InputLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputLayer")
            .field("input_type", &self.type_name)
            .finish()
    }
}

/// Handle to an input layer whose input type has been checked.
pub struct InputId<T> {
    id: LayerId,
    _input: PhantomData<fn(&T)>,
}

impl<T> InputId<T> {
    pub(crate) fn new(id: LayerId) -> Self {
        Self {
            id,
            _input: PhantomData,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }
}

impl<T> Clone for InputId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InputId<T> {}

impl<T> fmt::Debug for InputId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputId<{}>({})", type_name::<T>(), self.id.index())
    }
}
