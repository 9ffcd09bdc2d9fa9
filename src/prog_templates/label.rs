//! Fragment program for label (lookup-table) overlays.

/// Expects in the environment:
/// - `texCoord` (varying):      fragment texture coordinate
/// - `imageTexture` (texture):  label image
/// - `lutTexture` (texture):    label colour lookup table
/// - `voxValXform` (param):     x = scale, y = offset, voxel value -> label index
/// - `invNumLabels` (number):   1 / number of labels, scales the index into [0, 1]
/// - `texture_is_2d` (bool):    sample the image as 2D rather than 3D
/// - `outline`:                 falsy, or a vector of per-channel outline weights
pub const GLLABEL_FRAG: &str = "\
!!ARBfp1.0
# gllabel_frag.prog - colour fragments by looking up their voxel label in a
# lookup table texture. Fragments outside the image are killed before any
# texture access.

{{ arb_include('textest.prog') }}

TEMP boundsTest;
TEMP voxValue;
TEMP lutCoord;
TEMP colour;

{{ arb_call('textest.prog', texCoord='{{ varying_texCoord }}', out_result='boundsTest') }}
KIL boundsTest;

{% if texture_is_2d %}
TEX voxValue, {{ varying_texCoord }}, {{ texture_imageTexture }}, 2D;
{% else %}
TEX voxValue, {{ varying_texCoord }}, {{ texture_imageTexture }}, 3D;
{% endif %}

# Voxel value -> label index -> LUT coordinate
MAD lutCoord, voxValue, {{ param_voxValXform }}.x, {{ param_voxValXform }}.y;
MUL lutCoord.x, lutCoord.x, {{ invNumLabels }};

TEX colour, lutCoord, {{ texture_lutTexture }}, 1D;

{% if outline %}
MUL colour, colour, {{ outline }};
{% endif %}

MOV result.color, colour;

END
";
