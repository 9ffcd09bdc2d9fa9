//! Subroutine templates shared by the fragment programs.

/// Boundary test subroutine.
///
/// Formals:
/// - `texCoord`:   coordinate to test
/// - `out_result`: register receiving the test result
///
/// Writes, per component, a negative value into `out_result` when the
/// corresponding `texCoord` component falls outside the [0, 1] texture
/// range, and a positive value when it is inside. Callers typically follow
/// the call with an unswizzled `KIL <out_result>;` so that a fragment out of
/// bounds on any axis is discarded.
pub const TEXTEST: &str = "\
# textest.prog - texture coordinate boundary test
TEMP below;
TEMP above;
SGE below, {{ texCoord }}, { 0.0, 0.0, 0.0, 0.0 };
SLT above, {{ texCoord }}, { 1.0, 1.0, 1.0, 1.0 };
MUL {{ out_result }}, below, above;
SUB {{ out_result }}, {{ out_result }}, { 0.5, 0.5, 0.5, 0.5 };
";
