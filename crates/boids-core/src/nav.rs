use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Squared length under which a direction is treated as degenerate.
const DEGENERATE_LEN_SQ: f32 = 1e-12;

/// Position + orientation of a single agent, with smoothed forward motion.
///
/// Local axes: forward is `-Z`, up is `+Y`, right is `+X`. The orientation is
/// kept unit-norm by every mutating method; inputs that would produce a
/// non-finite rotation leave the previous orientation in place.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nav {
    position: Vec3,
    orientation: Quat,
    /// Current (smoothed) forward speed.
    velocity: f32,
    /// Forward speed requested by the last `move_f`.
    target_velocity: f32,
    /// Exponential smoothing coefficient in `[0, 1)`; 0 means no lag.
    smoothing: f32,
}

impl Default for Nav {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl Nav {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            velocity: 0.0,
            target_velocity: 0.0,
            smoothing: 0.0,
        }
    }

    /// Create a nav at `position` looking along `direction` with world-up as reference.
    /// A degenerate direction keeps the identity orientation.
    pub fn facing(position: Vec3, direction: Vec3) -> Self {
        let mut nav = Self::new(position);
        if let Some(rotation) =
            look_rotation(direction, Vec3::Y).or_else(|| look_rotation(direction, Vec3::Z))
        {
            nav.orientation = rotation;
        }
        nav
    }

    pub fn pos(&self) -> Vec3 {
        self.position
    }

    pub fn set_pos(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn quat(&self) -> Quat {
        self.orientation
    }

    /// Overwrite the raw quaternion components and renormalize.
    ///
    /// Returns `false` (orientation untouched) when the components cannot be
    /// normalized.
    pub fn set_quat(&mut self, x: f32, y: f32, z: f32, w: f32) -> bool {
        let q = Quat::from_xyzw(x, y, z, w);
        if !q.is_finite() || q.length_squared() < DEGENERATE_LEN_SQ {
            return false;
        }
        self.orientation = q.normalize();
        true
    }

    /// Forward unit vector.
    pub fn uf(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// Up unit vector.
    pub fn uu(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    /// Right unit vector.
    pub fn ur(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Set the velocity smoothing coefficient. Clamped to `[0, 0.999]`.
    pub fn smooth(&mut self, amount: f32) {
        if amount.is_finite() {
            self.smoothing = amount.clamp(0.0, 0.999);
        }
    }

    /// Rotate a fraction `amount` of the way toward looking at `point`.
    ///
    /// `up` is the reference up vector for the target frame; if it is parallel
    /// to the look direction the current up vector is used instead. A target
    /// coincident with the current position is a no-op.
    pub fn face_toward(&mut self, point: Vec3, up: Vec3, amount: f32) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        let direction = point - self.position;
        let Some(target) =
            look_rotation(direction, up).or_else(|| look_rotation(direction, self.uu()))
        else {
            tracing::trace!(?point, "face_toward skipped: degenerate direction");
            return;
        };
        let rotated = self.orientation.slerp(target, amount.min(1.0)).normalize();
        if rotated.is_finite() {
            self.orientation = rotated;
        }
    }

    /// Request forward motion at `speed` units per second.
    pub fn move_f(&mut self, speed: f32) {
        if speed.is_finite() {
            self.target_velocity = speed;
        }
    }

    /// Integrate one fixed step: smooth the velocity, then advance along forward.
    pub fn step(&mut self, dt: f32) {
        self.velocity += (self.target_velocity - self.velocity) * (1.0 - self.smoothing);
        self.position += self.uf() * (self.velocity * dt);
    }
}

/// Rotation whose forward (`-Z`) axis points along `forward`, rolled so its up
/// axis lies in the plane of `forward` and `up`.
pub(crate) fn look_rotation(forward: Vec3, up: Vec3) -> Option<Quat> {
    if !forward.is_finite() || forward.length_squared() < DEGENERATE_LEN_SQ {
        return None;
    }
    let forward = forward.normalize();
    let right = forward.cross(up);
    if !right.is_finite() || right.length_squared() < DEGENERATE_LEN_SQ {
        return None;
    }
    let right = right.normalize();
    let up = right.cross(forward);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, 1e-5), "expected {b:?}, got {a:?}");
    }

    #[test]
    fn identity_frame_faces_negative_z() {
        let nav = Nav::default();
        assert_vec_close(nav.uf(), Vec3::NEG_Z);
        assert_vec_close(nav.uu(), Vec3::Y);
        assert_vec_close(nav.ur(), Vec3::X);
    }

    #[test]
    fn facing_points_forward_along_direction() {
        let nav = Nav::facing(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0));
        assert_vec_close(nav.uf(), Vec3::X);
        assert_vec_close(nav.uu(), Vec3::Y);
    }

    #[test]
    fn facing_straight_up_falls_back_to_alternate_reference() {
        let nav = Nav::facing(Vec3::ZERO, Vec3::Y);
        assert_vec_close(nav.uf(), Vec3::Y);
        assert!((nav.quat().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn face_toward_full_amount_snaps_to_target() {
        let mut nav = Nav::facing(Vec3::ZERO, Vec3::X);
        nav.face_toward(Vec3::new(0.0, 0.0, 10.0), Vec3::Y, 1.0);
        assert_vec_close(nav.uf(), Vec3::Z);
    }

    #[test]
    fn face_toward_partial_amount_turns_part_way() {
        let mut nav = Nav::facing(Vec3::ZERO, Vec3::X);
        nav.face_toward(Vec3::new(0.0, 0.0, 10.0), Vec3::Y, 0.5);
        let f = nav.uf();
        assert!(f.x > 0.1 && f.z > 0.1, "expected heading between +x and +z, got {f:?}");
    }

    #[test]
    fn face_toward_zero_amount_is_noop() {
        let mut nav = Nav::facing(Vec3::ZERO, Vec3::X);
        let before = nav.quat();
        nav.face_toward(Vec3::new(0.0, 5.0, 5.0), Vec3::Y, 0.0);
        assert_eq!(nav.quat(), before);
    }

    #[test]
    fn face_toward_own_position_is_noop() {
        let mut nav = Nav::facing(Vec3::new(1.0, 2.0, 3.0), Vec3::X);
        let before = nav.quat();
        nav.face_toward(Vec3::new(1.0, 2.0, 3.0), Vec3::Y, 0.75);
        assert_eq!(nav.quat(), before);
    }

    #[test]
    fn face_toward_ignores_nan_target() {
        let mut nav = Nav::facing(Vec3::ZERO, Vec3::X);
        let before = nav.quat();
        nav.face_toward(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::Y, 0.5);
        assert_eq!(nav.quat(), before);
    }

    #[test]
    fn set_quat_renormalizes() {
        let mut nav = Nav::default();
        assert!(nav.set_quat(2.0, 0.0, 0.0, 2.0));
        assert!((nav.quat().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn set_quat_rejects_zero_quaternion() {
        let mut nav = Nav::facing(Vec3::ZERO, Vec3::X);
        let before = nav.quat();
        assert!(!nav.set_quat(0.0, 0.0, 0.0, 0.0));
        assert_eq!(nav.quat(), before);
    }

    #[test]
    fn step_advances_along_forward_by_speed_times_dt() {
        let mut nav = Nav::facing(Vec3::ZERO, Vec3::X);
        nav.move_f(2.0);
        nav.step(0.5);
        assert_vec_close(nav.pos(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn smoothing_lags_velocity_changes() {
        let mut nav = Nav::facing(Vec3::ZERO, Vec3::X);
        nav.smooth(0.5);
        nav.move_f(2.0);
        nav.step(1.0);
        assert!((nav.velocity() - 1.0).abs() < 1e-6);
        nav.step(1.0);
        assert!((nav.velocity() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn step_is_bitwise_reproducible() {
        let mut a = Nav::facing(Vec3::new(0.3, -1.2, 4.0), Vec3::new(1.0, 2.0, -0.5));
        a.smooth(0.1);
        a.move_f(0.7);
        let mut b = a;
        for _ in 0..100 {
            a.step(1.0 / 60.0);
            b.step(1.0 / 60.0);
        }
        assert_eq!(a.pos().to_array(), b.pos().to_array());
    }

    proptest! {
        #[test]
        fn proptest_face_toward_keeps_unit_orientation(
            start in proptest::array::uniform3(-50.0f32..50.0),
            heading in proptest::array::uniform3(-1.0f32..1.0),
            target in proptest::array::uniform3(-50.0f32..50.0),
            up in proptest::array::uniform3(-1.0f32..1.0),
            amount in -0.5f32..1.5,
        ) {
            let mut nav = Nav::facing(Vec3::from_array(start), Vec3::from_array(heading));
            nav.face_toward(Vec3::from_array(target), Vec3::from_array(up), amount);
            let q = nav.quat();
            prop_assert!(q.is_finite());
            prop_assert!((q.length() - 1.0).abs() < 1e-4);
        }
    }
}
