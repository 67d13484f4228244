//! PyO3 wrapper for LendingEnv

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::types::{observation_to_py, state_to_py, step_result_to_py, to_py_err};
use crate::environment::{EnvVariant, LendingEnv as RustLendingEnv};

/// Python wrapper for the Rust lending environment
///
/// # Example (from Python)
///
/// ```python
/// from lending_simulator._core import LendingEnv
///
/// env = LendingEnv("delayed_impact", 12345)
/// obs = env.reset()
/// result = env.step(1)
/// print(result["bank_cash"], result["done"])
/// ```
#[pyclass(name = "LendingEnv")]
pub struct PyLendingEnv {
    inner: RustLendingEnv,
}

#[pymethods]
impl PyLendingEnv {
    /// Create an environment for a built-in variant
    ///
    /// Raises ValueError for an unknown variant name.
    #[new]
    fn new(variant: &str, seed: u64) -> PyResult<Self> {
        let variant = EnvVariant::by_name(variant).map_err(to_py_err)?;
        let inner = RustLendingEnv::new(variant, seed).map_err(to_py_err)?;
        Ok(PyLendingEnv { inner })
    }

    /// Start a new episode; returns the first observation
    #[pyo3(signature = (seed=None))]
    fn reset(&mut self, py: Python, seed: Option<u64>) -> PyResult<Py<PyDict>> {
        let observation = match seed {
            Some(seed) => self.inner.reset_with_seed(seed),
            None => self.inner.reset(),
        }
        .map_err(to_py_err)?;
        observation_to_py(py, &observation)
    }

    /// Apply action 0 (reject) or 1 (accept)
    ///
    /// Returns a dict with the next observation plus `step`, `cash_delta`
    /// and `done`.
    fn step(&mut self, py: Python, action: i64) -> PyResult<Py<PyDict>> {
        let result = self.inner.step_index(action).map_err(to_py_err)?;
        step_result_to_py(py, &result)
    }

    /// Full current state, or None before the first reset
    fn state(&self, py: Python) -> PyResult<Option<Py<PyDict>>> {
        self.inner
            .state()
            .map(|state| state_to_py(py, state))
            .transpose()
    }

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    fn history_len(&self) -> usize {
        self.inner.history().len()
    }

    /// Current cluster weights of a group in the running episode
    fn cluster_weights(&self, group: usize) -> PyResult<Vec<f64>> {
        let state = self
            .inner
            .state()
            .ok_or_else(|| to_py_err(crate::environment::SimulationError::NotReset))?;
        state
            .params()
            .applicant_distribution
            .cluster_weights(group)
            .map(|weights| weights.to_vec())
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))
    }

    /// History as JSON, tagged with the params fingerprint
    fn history_json(&self) -> PyResult<String> {
        self.inner
            .history()
            .to_record(self.inner.initial_params())
            .and_then(|record| record.to_json())
            .map_err(to_py_err)
    }
}
