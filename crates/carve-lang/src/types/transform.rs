//! Hand-rolled f64 transform math: quaternion rotation plus a
//! translation/rotation/scale record with exact composition.

/// Unit quaternion, (x, y, z, w) with w the scalar part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quat {
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub fn from_axis_angle(axis: [f64; 3], angle: f64) -> Self {
        let half = angle * 0.5;
        let s = half.sin();
        Self { x: axis[0] * s, y: axis[1] * s, z: axis[2] * s, w: half.cos() }
    }

    /// Euler angles in radians, applied about X, then Y, then Z.
    pub fn from_euler(rx: f64, ry: f64, rz: f64) -> Self {
        let qx = Self::from_axis_angle([1.0, 0.0, 0.0], rx);
        let qy = Self::from_axis_angle([0.0, 1.0, 0.0], ry);
        let qz = Self::from_axis_angle([0.0, 0.0, 1.0], rz);
        qz.mul(qy).mul(qx)
    }

    pub fn mul(self, r: Self) -> Self {
        Self {
            x: self.w * r.x + self.x * r.w + self.y * r.z - self.z * r.y,
            y: self.w * r.y - self.x * r.z + self.y * r.w + self.z * r.x,
            z: self.w * r.z + self.x * r.y - self.y * r.x + self.z * r.w,
            w: self.w * r.w - self.x * r.x - self.y * r.y - self.z * r.z,
        }
    }

    pub fn rotate(self, v: [f64; 3]) -> [f64; 3] {
        // v' = v + 2q × (q × v + wv), with q the vector part
        let qv = [self.x, self.y, self.z];
        let t = cross(qv, v);
        let t = [t[0] + self.w * v[0], t[1] + self.w * v[1], t[2] + self.w * v[2]];
        let c = cross(qv, t);
        [v[0] + 2.0 * c[0], v[1] + 2.0 * c[1], v[2] + 2.0 * c[2]]
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

// ─── Transform ────────────────────────────────────────────────────────────────

/// Translation, rotation, scale applied in scale → rotate → translate order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f64; 3],
    pub rotation: Quat,
    pub scale: [f64; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: [0.0; 3], rotation: Quat::IDENTITY, scale: [1.0; 3] }
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_translation(v: [f64; 3]) -> Self {
        Self { position: v, ..Self::identity() }
    }

    /// Rotation from Euler angles in radians.
    pub fn from_euler(v: [f64; 3]) -> Self {
        Self { rotation: Quat::from_euler(v[0], v[1], v[2]), ..Self::identity() }
    }

    pub fn from_scale(v: [f64; 3]) -> Self {
        Self { scale: v, ..Self::identity() }
    }

    /// `self` then `child`: the result maps child-local coordinates through
    /// `child`, then through `self`.
    pub fn compose(&self, child: &Transform) -> Transform {
        let scaled = [
            child.position[0] * self.scale[0],
            child.position[1] * self.scale[1],
            child.position[2] * self.scale[2],
        ];
        let rotated = self.rotation.rotate(scaled);
        Transform {
            position: [
                self.position[0] + rotated[0],
                self.position[1] + rotated[1],
                self.position[2] + rotated[2],
            ],
            rotation: self.rotation.mul(child.rotation),
            scale: [
                self.scale[0] * child.scale[0],
                self.scale[1] * child.scale[1],
                self.scale[2] * child.scale[2],
            ],
        }
    }

    pub fn apply_point(&self, p: [f64; 3]) -> [f64; 3] {
        let scaled = [p[0] * self.scale[0], p[1] * self.scale[1], p[2] * self.scale[2]];
        let rotated = self.rotation.rotate(scaled);
        [
            self.position[0] + rotated[0],
            self.position[1] + rotated[1],
            self.position[2] + rotated[2],
        ]
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
