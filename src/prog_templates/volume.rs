//! Fragment program for scalar volume overlays.

/// Expects in the environment:
/// - `texCoord` (varying):         fragment texture coordinate
/// - `imageTexture` (texture):     image data
/// - `colourMapTexture` (texture): 1D transfer function
/// - `voxValXform` (param):        x = scale, y = offset, voxel value -> colour map coordinate
/// - `texture_is_2d` (bool):       sample the image as 2D rather than 3D
/// - `clipping` (bool):            kill fragments below the clip threshold
/// - `clipLo` (param):             clip threshold, only read when `clipping`
/// - `use_alpha` (bool):           modulate the colour map alpha
/// - `alpha` (param):              alpha factor, only read when `use_alpha`
pub const GLVOLUME_FRAG: &str = "\
!!ARBfp1.0
# glvolume_frag.prog - transform each voxel value through a 1D colour map.
# Fragments outside the image are killed before any texture access.

{{ arb_include('textest.prog') }}

TEMP boundsTest;
TEMP voxValue;
TEMP colour;

{{ arb_call('textest.prog', texCoord='{{ varying_texCoord }}', out_result='boundsTest') }}
KIL boundsTest;

{% if texture_is_2d %}
TEX voxValue, {{ varying_texCoord }}, {{ texture_imageTexture }}, 2D;
{% else %}
TEX voxValue, {{ varying_texCoord }}, {{ texture_imageTexture }}, 3D;
{% endif %}

# Voxel value -> colour map coordinate
MAD voxValue, voxValue, {{ param_voxValXform }}.x, {{ param_voxValXform }}.y;

{% if clipping %}
TEMP clipTest;
SUB clipTest.x, voxValue.x, {{ param_clipLo }}.x;
KIL clipTest.x;
{% endif %}

TEX colour, voxValue, {{ texture_colourMapTexture }}, 1D;

{% if use_alpha %}
MUL colour.a, colour.a, {{ param_alpha }}.x;
{% endif %}

MOV result.color, colour;

END
";
