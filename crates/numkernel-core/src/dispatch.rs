//! Kernel variant registry
//!
//! Algorithm crates register one factory per `(algorithm, method, element
//! type, CPU level)`. [`RegistryBuilder::build`] resolves each
//! `(algorithm, method, element type)` to the highest level the CPU can run,
//! instantiates that kernel once and freezes the table. Selection afterwards
//! is a plain map lookup.

use crate::bundle::{AlgorithmId, MethodId};
use crate::cpu::CpuType;
use crate::error::{Error, Result};
use crate::kernel::{ComputeMode, KernelStrategy};
use crate::modes::{Batch, DistributedLocal, DistributedMaster, Online};
use crate::numeric::{FloatType, Numeric};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Constructor of one kernel variant
pub type KernelFactory<T> = fn() -> Arc<dyn KernelStrategy<T>>;

/// Identity of a registered kernel family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelKey {
    pub algorithm: AlgorithmId,
    pub method: MethodId,
    pub float_type: FloatType,
}

/// Registered variants for one element type
pub struct VariantTable<T: Numeric> {
    variants: BTreeMap<(AlgorithmId, MethodId), BTreeMap<CpuType, KernelFactory<T>>>,
}

impl<T: Numeric> Default for VariantTable<T> {
    fn default() -> Self {
        Self {
            variants: BTreeMap::new(),
        }
    }
}

/// Resolved kernels for one element type
pub struct KernelTable<T: Numeric> {
    kernels: HashMap<(AlgorithmId, MethodId), Arc<dyn KernelStrategy<T>>>,
}

impl<T: Numeric> Default for KernelTable<T> {
    fn default() -> Self {
        Self {
            kernels: HashMap::new(),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Element types the registry keeps tables for
pub trait Dispatchable: Numeric + sealed::Sealed {
    #[doc(hidden)]
    fn variants(builder: &mut RegistryBuilder) -> &mut VariantTable<Self>;

    #[doc(hidden)]
    fn kernels(registry: &KernelRegistry) -> &KernelTable<Self>;
}

impl Dispatchable for f32 {
    fn variants(builder: &mut RegistryBuilder) -> &mut VariantTable<Self> {
        &mut builder.f32
    }

    fn kernels(registry: &KernelRegistry) -> &KernelTable<Self> {
        &registry.f32
    }
}

impl Dispatchable for f64 {
    fn variants(builder: &mut RegistryBuilder) -> &mut VariantTable<Self> {
        &mut builder.f64
    }

    fn kernels(registry: &KernelRegistry) -> &KernelTable<Self> {
        &registry.f64
    }
}

/// Mutable collection of kernel factories
#[derive(Default)]
pub struct RegistryBuilder {
    f32: VariantTable<f32>,
    f64: VariantTable<f64>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the variant of `(algorithm, method)` for level `cpu`
    ///
    /// A second factory for the same slot is ignored with a warning.
    pub fn register<T: Dispatchable>(
        &mut self,
        algorithm: AlgorithmId,
        method: MethodId,
        cpu: CpuType,
        factory: KernelFactory<T>,
    ) -> &mut Self {
        let slot = T::variants(self)
            .variants
            .entry((algorithm, method))
            .or_default();
        if slot.contains_key(&cpu) {
            log::warn!(
                "ignoring duplicate {} kernel for {}/{} at {}",
                T::FLOAT_TYPE,
                algorithm,
                method,
                cpu
            );
        } else {
            slot.insert(cpu, factory);
        }
        self
    }

    /// Resolve every kernel family for a CPU of level `cpu`
    ///
    /// The level is capped at the detected level of the running CPU, so a
    /// registry never hands out a kernel the hardware cannot execute.
    pub fn build(&self, cpu: CpuType) -> KernelRegistry {
        let detected = CpuType::detected();
        let level = if cpu > detected {
            log::debug!("requested cpu level {cpu} capped at detected {detected}");
            detected
        } else {
            cpu
        };
        KernelRegistry {
            cpu: level,
            f32: resolve(&self.f32, level),
            f64: resolve(&self.f64, level),
        }
    }
}

fn resolve<T: Numeric>(table: &VariantTable<T>, level: CpuType) -> KernelTable<T> {
    let mut kernels = HashMap::new();
    for (&(algorithm, method), variants) in &table.variants {
        match variants.range(..=level).next_back() {
            Some((&variant, factory)) => {
                let kernel = factory();
                log::debug!(
                    "selected {} ({}) for {}/{} {} on {}",
                    kernel.name(),
                    variant,
                    algorithm,
                    method,
                    T::FLOAT_TYPE,
                    level
                );
                kernels.insert((algorithm, method), kernel);
            }
            None => log::debug!(
                "no {} variant of {}/{} runs at {}",
                T::FLOAT_TYPE,
                algorithm,
                method,
                level
            ),
        }
    }
    KernelTable { kernels }
}

/// Frozen kernel table for one CPU level
pub struct KernelRegistry {
    cpu: CpuType,
    f32: KernelTable<f32>,
    f64: KernelTable<f64>,
}

impl KernelRegistry {
    /// Level the kernels were resolved for
    pub fn cpu(&self) -> CpuType {
        self.cpu
    }

    /// Kernel for `(algorithm, method)` on element type `T`
    pub fn select<T: Dispatchable>(
        &self,
        algorithm: AlgorithmId,
        method: MethodId,
    ) -> Result<Arc<dyn KernelStrategy<T>>> {
        T::kernels(self)
            .kernels
            .get(&(algorithm, method))
            .cloned()
            .ok_or_else(|| {
                Error::UnsupportedConfiguration(format!(
                    "no {} kernel for {}/{} at cpu level {}",
                    T::FLOAT_TYPE,
                    algorithm,
                    method,
                    self.cpu
                ))
            })
    }

    /// Every resolved kernel family, sorted
    pub fn keys(&self) -> Vec<KernelKey> {
        let f32_keys = self.f32.kernels.keys().map(|&(algorithm, method)| KernelKey {
            algorithm,
            method,
            float_type: FloatType::F32,
        });
        let f64_keys = self.f64.kernels.keys().map(|&(algorithm, method)| KernelKey {
            algorithm,
            method,
            float_type: FloatType::F64,
        });
        let mut keys: Vec<KernelKey> = f32_keys.chain(f64_keys).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.f32.kernels.len() + self.f64.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select_for<T: Dispatchable>(
        &self,
        algorithm: AlgorithmId,
        method: MethodId,
        mode: ComputeMode,
    ) -> Result<Arc<dyn KernelStrategy<T>>> {
        let kernel = self.select::<T>(algorithm, method)?;
        if !kernel.supports(mode) {
            return Err(Error::unsupported(kernel.name(), &format!("{mode} mode")));
        }
        Ok(kernel)
    }

    /// Batch mode over the selected kernel
    pub fn batch<T: Dispatchable>(
        &self,
        algorithm: AlgorithmId,
        method: MethodId,
    ) -> Result<Batch<T>> {
        Batch::new(self.select_for(algorithm, method, ComputeMode::Batch)?)
    }

    /// Online mode over the selected kernel
    pub fn online<T: Dispatchable>(
        &self,
        algorithm: AlgorithmId,
        method: MethodId,
    ) -> Result<Online<T>> {
        Online::new(self.select_for(algorithm, method, ComputeMode::Online)?)
    }

    /// Distributed local step over the selected kernel
    pub fn distributed_local<T: Dispatchable>(
        &self,
        algorithm: AlgorithmId,
        method: MethodId,
    ) -> Result<DistributedLocal<T>> {
        DistributedLocal::new(self.select_for(algorithm, method, ComputeMode::Distributed)?)
    }

    /// Distributed master step over the selected kernel
    pub fn distributed_master<T: Dispatchable>(
        &self,
        algorithm: AlgorithmId,
        method: MethodId,
    ) -> Result<DistributedMaster<T>> {
        DistributedMaster::new(self.select_for(algorithm, method, ComputeMode::Distributed)?)
    }
}

impl std::fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelRegistry")
            .field("cpu", &self.cpu)
            .field("kernels", &self.keys())
            .finish()
    }
}
