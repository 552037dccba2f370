//! Simulation methods and fake device models offered by the simulator.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Algorithm used by the ideal simulator.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum SimulationMethod {
    /// Picks a method from the circuit and noise model.
    #[default]
    Automatic,
    /// Dense statevector.
    Statevector,
    /// Dense density matrix.
    DensityMatrix,
    /// Clifford stabilizer tableau.
    Stabilizer,
    /// Tensor-network matrix product state.
    MatrixProductState,
    /// Clifford+T decomposition.
    ExtendedStabilizer,
    /// Full circuit unitary.
    Unitary,
    /// Full circuit superoperator.
    Superop,
}

impl SimulationMethod {
    /// Method name as spelt in selection strings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A fake device: a noisy simulator shaped like real hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeDevice {
    name: &'static str,
    num_qubits: u32,
}

impl FakeDevice {
    const fn new(name: &'static str, num_qubits: u32) -> Self {
        Self { name, num_qubits }
    }

    /// Device name as spelt in selection strings.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Number of qubits on the device.
    #[must_use]
    pub const fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Looks up a device by name.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        FAKE_DEVICES.iter().copied().find(|device| device.name == name)
    }
}

/// Every fake device the simulator can impersonate.
pub const FAKE_DEVICES: &[FakeDevice] = &[
    FakeDevice::new("fake_quito", 5),
    FakeDevice::new("fake_lima", 5),
    FakeDevice::new("fake_manila", 5),
    FakeDevice::new("fake_jakarta", 7),
    FakeDevice::new("fake_brooklyn", 65),
    FakeDevice::new("fake_washington", 127),
];
