//! GLSL sources for the lightning field.
//!
//! Both stages are Vulkan-flavoured GLSL 450 so wgpu's GLSL frontend accepts
//! them. The noise helpers are kept in lockstep with [`crate::noise`].

/// Pass-through vertex stage for the two-triangle full-screen quad.
pub const VERTEX_SHADER: &str = r"#version 450
layout(location = 0) in vec2 aPosition;

void main() {
    gl_Position = vec4(aPosition, 0.0, 1.0);
}
";

/// Domain-warped fractal noise rendered as an inverse-distance filament.
///
/// The parameter block layout must match [`super::FrameUniforms`]. Members
/// carry a leading underscore and are aliased through macros so the body can
/// use the plain uniform names.
pub const FRAGMENT_SHADER: &str = r"#version 450
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform LightningParams {
    vec2 _iResolution;
    float _iTime;
    float _uHue;
    float _uXOffset;
    float _uSpeed;
    float _uIntensity;
    float _uSize;
} params;

#define iResolution params._iResolution
#define iTime params._iTime
#define uHue params._uHue
#define uXOffset params._uXOffset
#define uSpeed params._uSpeed
#define uIntensity params._uIntensity
#define uSize params._uSize

#define OCTAVE_COUNT 10
#define OCTAVE_ROTATION 0.45

vec3 hsv2rgb(vec3 c) {
    vec3 rgb = clamp(abs(mod(c.x * 6.0 + vec3(0.0, 4.0, 2.0), 6.0) - 3.0) - 1.0, 0.0, 1.0);
    return c.z * mix(vec3(1.0), rgb, c.y);
}

float hash11(float p) {
    p = fract(p * 0.1031);
    p *= p + 33.33;
    p *= p + p;
    return fract(p);
}

float hash12(vec2 p) {
    vec3 p3 = fract(vec3(p.xyx) * 0.1031);
    p3 += dot(p3, p3.yzx + 33.33);
    return fract((p3.x + p3.y) * p3.z);
}

float noise(vec2 p) {
    vec2 ip = floor(p);
    vec2 fp = fract(p);
    float a = hash12(ip);
    float b = hash12(ip + vec2(1.0, 0.0));
    float c = hash12(ip + vec2(0.0, 1.0));
    float d = hash12(ip + vec2(1.0, 1.0));
    vec2 t = fp * fp * (3.0 - 2.0 * fp);
    return mix(mix(a, b, t.x), mix(c, d, t.x), t.y);
}

float fbm(vec2 p) {
    float s = sin(OCTAVE_ROTATION);
    float c = cos(OCTAVE_ROTATION);
    float value = 0.0;
    float amplitude = 0.5;
    for (int i = 0; i < OCTAVE_COUNT; ++i) {
        value += amplitude * noise(p);
        p = vec2(c * p.x - s * p.y, s * p.x + c * p.y);
        p *= 2.0;
        amplitude *= 0.5;
    }
    return value;
}

void main() {
    // wgpu puts the origin top-left; flip so y grows upward like GL.
    vec2 fragCoord = vec2(gl_FragCoord.x, iResolution.y - gl_FragCoord.y);
    vec2 uv = fragCoord / iResolution;
    uv = 2.0 * uv - 1.0;
    uv.x *= iResolution.x / iResolution.y;
    uv.x += uXOffset;
    uv += 2.0 * fbm(uv * uSize + 0.8 * iTime * uSpeed) - 1.0;
    float dist = abs(uv.x);
    vec3 baseColor = hsv2rgb(vec3(uHue / 360.0, 0.7, 0.8));
    float flicker = mix(0.0, 0.07, hash11(iTime * uSpeed));
    vec3 col = baseColor * (flicker / max(dist, 0.001)) * uIntensity;
    outColor = vec4(col, 1.0);
}
";
