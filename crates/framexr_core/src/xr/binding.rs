//! Typed extension-function bindings and their per-instance cache.
//!
//! # Responsibility
//! - Bind a resolved call target to its exact C signature.
//! - Cache resolved targets for one instance generation.
//! - Provide the two-call capacity idiom used by enumeration entry points.
//!
//! # Invariants
//! - A binding is stamped with the instance generation it was resolved under
//!   and refuses to hand out its pointer for any other generation.
//! - The cache is emptied whenever the instance changes or is destroyed.

use crate::xr::resolver::FunctionResolver;
use crate::xr::result::{check, CallResult, XrCallError};
use log::warn;
use openxr_sys as sys;
use std::collections::HashMap;

/// Counter distinguishing successive instances seen by one facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceGeneration(u64);

impl InstanceGeneration {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1).max(1))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Extension entry point with a fixed C signature.
///
/// # Safety
/// `Pfn` must be exactly the function-pointer type the OpenXR registry defines
/// for `NAME`; `cast` reinterprets a runtime pointer as that type.
pub unsafe trait ExtensionFunction {
    const NAME: &'static str;
    type Pfn: Copy + Send + Sync;

    /// # Safety
    /// `target` must have been returned by the runtime for `Self::NAME`.
    unsafe fn cast(target: sys::pfn::VoidFunction) -> Self::Pfn;
}

/// Declares a marker type implementing [`ExtensionFunction`].
#[macro_export]
macro_rules! extension_function {
    ($(#[$meta:meta])* $vis:vis $marker:ident = $name:literal => $pfn:ty) => {
        $(#[$meta])*
        $vis enum $marker {}

        unsafe impl $crate::xr::binding::ExtensionFunction for $marker {
            const NAME: &'static str = $name;
            type Pfn = $pfn;

            unsafe fn cast(target: $crate::xr::sys::pfn::VoidFunction) -> $pfn {
                unsafe { ::std::mem::transmute::<$crate::xr::sys::pfn::VoidFunction, $pfn>(target) }
            }
        }
    };
}

/// Typed callable resolved under one instance generation.
pub struct Binding<F: ExtensionFunction> {
    pfn: F::Pfn,
    generation: InstanceGeneration,
}

impl<F: ExtensionFunction> Clone for Binding<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: ExtensionFunction> Copy for Binding<F> {}

impl<F: ExtensionFunction> std::fmt::Debug for Binding<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("name", &F::NAME)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl<F: ExtensionFunction> Binding<F> {
    pub fn generation(&self) -> InstanceGeneration {
        self.generation
    }

    /// Returns the typed pointer when `current` is the generation it was
    /// resolved under.
    pub fn get(&self, current: Option<InstanceGeneration>) -> CallResult<F::Pfn> {
        if current == Some(self.generation) {
            return Ok(self.pfn);
        }
        Err(XrCallError::StaleBinding {
            function: F::NAME,
            bound_generation: self.generation.get(),
            current_generation: current.map(InstanceGeneration::get),
        })
    }
}

/// Resolved targets for the currently bound instance.
#[derive(Default)]
pub struct BindingCache {
    instance: Option<(sys::Instance, InstanceGeneration)>,
    targets: HashMap<&'static str, sys::pfn::VoidFunction>,
}

impl BindingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new validity window; previously cached targets are dropped.
    pub fn bind_instance(&mut self, instance: sys::Instance, generation: InstanceGeneration) {
        self.targets.clear();
        self.instance = Some((instance, generation));
    }

    /// Drops cached targets but keeps the instance bound.
    pub fn clear_targets(&mut self) {
        self.targets.clear();
    }

    /// Forgets the instance and every cached target.
    pub fn invalidate(&mut self) {
        self.targets.clear();
        self.instance = None;
    }

    pub fn generation(&self) -> Option<InstanceGeneration> {
        self.instance.map(|(_, generation)| generation)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Returns the binding for `F`, resolving it on first use.
    pub fn resolve<F: ExtensionFunction>(
        &mut self,
        resolver: &FunctionResolver,
    ) -> CallResult<Binding<F>> {
        let Some((instance, generation)) = self.instance else {
            return Err(XrCallError::NotInitialized(F::NAME));
        };

        let target = match self.targets.get(F::NAME) {
            Some(target) => *target,
            None => {
                let target = resolver
                    .resolve(instance, F::NAME)
                    .map_err(|_| XrCallError::FunctionUnresolved(F::NAME))?;
                self.targets.insert(F::NAME, target);
                target
            }
        };

        Ok(Binding {
            // SAFETY: `target` came from the runtime for `F::NAME`.
            pfn: unsafe { F::cast(target) },
            generation,
        })
    }
}

/// Runs the two-call capacity idiom for `function`.
///
/// `call(capacity, count_out, buffer)` is invoked first with capacity 0 and a
/// null buffer, then with a buffer sized to the reported count. Each result is
/// checked on its own and the first failure is returned.
pub fn enumerate_two_call<T, C>(function: &'static str, mut call: C) -> CallResult<Vec<T>>
where
    T: Copy + Default,
    C: FnMut(u32, &mut u32, *mut T) -> sys::Result,
{
    let mut required = 0u32;
    check(function, call(0, &mut required, std::ptr::null_mut()))?;

    let mut values = vec![T::default(); required as usize];
    let mut written = 0u32;
    check(function, call(required, &mut written, values.as_mut_ptr()))?;

    if written != required {
        warn!(
            "event=xr_enumerate module=xr status=mismatch function={} required={} written={}",
            function, required, written
        );
    }
    values.truncate(written.min(required) as usize);
    Ok(values)
}
