/// Weather provider clients.
///
/// Submodules:
/// - `accuweather` resolves coordinates to provider location keys and
///   fetches past-hour precipitation.

pub mod accuweather;
