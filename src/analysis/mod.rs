/// Rainfall aggregation utilities.
///
/// Pure computations over the monitor log. No I/O lives here; every function
/// takes the evaluation instant as a parameter so results are deterministic
/// in tests.
///
/// Submodules:
/// - `rolling` computes trailing-window sums over hourly log entries.

pub mod rolling;
