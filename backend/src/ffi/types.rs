//! Type conversion utilities for FFI boundary

use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::environment::{Observation, SimulationError, StepResult};
use crate::models::LendingState;

/// Map a simulation error onto the matching Python exception
///
/// Caller mistakes (bad action, bad config, unsupported render) become
/// `ValueError`; lifecycle and invariant errors become `RuntimeError`.
pub fn to_py_err(err: SimulationError) -> PyErr {
    match err {
        SimulationError::InvalidAction(_)
        | SimulationError::InvalidConfig(_)
        | SimulationError::UnsupportedRenderRequest(_) => {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(err.to_string())
        }
        _ => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(err.to_string()),
    }
}

/// Membership as a list of ints (a `Vec<u8>` would become `bytes`)
fn membership_list(group: &[u8]) -> Vec<u32> {
    group.iter().map(|g| u32::from(*g)).collect()
}

/// Convert Observation to Python dict
pub fn observation_to_py(py: Python, observation: &Observation) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("bank_cash", observation.bank_cash)?;
    dict.set_item("applicant_features", observation.applicant_features.clone())?;
    dict.set_item("group", membership_list(&observation.group))?;
    Ok(dict.into())
}

/// Convert StepResult to Python dict
pub fn step_result_to_py(py: Python, result: &StepResult) -> PyResult<Py<PyDict>> {
    let dict = observation_to_py(py, &result.observation)?;
    {
        let bound = dict.bind(py);
        bound.set_item("step", result.step)?;
        bound.set_item("cash_delta", result.cash_delta)?;
        bound.set_item("done", result.done)?;
    }
    Ok(dict)
}

/// Convert LendingState to Python dict (latent outcome included)
pub fn state_to_py(py: Python, state: &LendingState) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("bank_cash", state.bank_cash())?;
    dict.set_item("applicant_features", state.applicant_features().map(|f| f.to_vec()))?;
    dict.set_item("group", state.group().map(membership_list))?;
    dict.set_item("group_id", state.group_id())?;
    dict.set_item("will_default", state.will_default())?;
    dict.set_item("rng_state", state.rng().get_state())?;
    Ok(dict.into())
}
