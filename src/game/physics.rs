//! Ball physics and collision for a single tick
//!
//! All functions here are pure: state out is fully determined by state in,
//! so a match replays identically from (seed, input history).

use rand::Rng;

use crate::ws::protocol::Side;

/// Court bounds, normalized on both axes
pub const COURT_MIN: f32 = 0.0;
pub const COURT_MAX: f32 = 100.0;
pub const COURT_CENTER: f32 = 50.0;

/// Vertical reach of a paddle from its center
pub const PADDLE_HALF_HEIGHT: f32 = 10.0;

/// Horizontal planes where paddles can intercept the ball
pub const LEFT_PADDLE_PLANE: f32 = 5.0;
pub const RIGHT_PADDLE_PLANE: f32 = 95.0;

/// Ball speed in court units per tick
pub const BALL_BASE_SPEED: f32 = 0.3;
/// Speed multiplier applied on every paddle bounce
pub const BALL_SPEED_GROWTH: f32 = 1.12;
/// Speed never grows past this
pub const BALL_MAX_SPEED: f32 = 1.0;

/// Steepest exit angle off a paddle edge, in degrees
pub const MAX_BOUNCE_ANGLE_DEG: f32 = 75.0;

/// Serve directions, as angles from horizontal. Near-horizontal angles are
/// excluded so a serve can never stalemate between the paddle planes.
const SERVE_ANGLES_DEG: [f32; 6] = [-60.0, -45.0, -30.0, 30.0, 45.0, 60.0];

/// Ball state: position plus a direction unit vector.
/// Scalar speed is tracked separately by the match so it survives respawns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

/// Physics step functions operating on one ball
pub struct Physics;

impl Physics {
    /// Linear integration of the ball position for one tick
    pub fn advance(ball: &mut Ball, speed: f32) {
        ball.x += ball.dx * speed;
        ball.y += ball.dy * speed;
    }

    /// Clamp against the top/bottom rails and invert vertical direction.
    /// After this the ball's y is always within court bounds.
    pub fn reflect_walls(ball: &mut Ball) {
        if ball.y <= COURT_MIN {
            ball.y = COURT_MIN;
            ball.dy = ball.dy.abs();
        } else if ball.y >= COURT_MAX {
            ball.y = COURT_MAX;
            ball.dy = -ball.dy.abs();
        }
    }

    /// Whether the ball has reached `side`'s contact plane within reach of
    /// the paddle. Only triggers while the ball travels toward that plane,
    /// so a fresh bounce is not re-flipped on the next tick.
    pub fn paddle_hit(ball: &Ball, paddle_y: f32, side: Side) -> bool {
        let at_plane = match side {
            Side::Player1 => ball.x <= LEFT_PADDLE_PLANE && ball.dx < 0.0,
            Side::Player2 => ball.x >= RIGHT_PADDLE_PLANE && ball.dx > 0.0,
        };
        at_plane && (ball.y - paddle_y).abs() <= PADDLE_HALF_HEIGHT
    }

    /// Recompute the ball direction from where it struck the paddle.
    /// A center strike exits near-horizontal; an edge strike exits at the
    /// maximum angle. The ball always leaves toward the opposing side.
    pub fn bounce(ball: &mut Ball, paddle_y: f32, side: Side) {
        let offset = ((ball.y - paddle_y) / PADDLE_HALF_HEIGHT).clamp(-1.0, 1.0);
        let angle = offset * MAX_BOUNCE_ANGLE_DEG.to_radians();

        let toward_opponent = match side {
            Side::Player1 => 1.0,
            Side::Player2 => -1.0,
        };
        ball.dx = toward_opponent * angle.cos();
        ball.dy = angle.sin();
    }

    /// Speed increase applied on a successful paddle bounce
    pub fn grow_speed(speed: f32) -> f32 {
        (speed * BALL_SPEED_GROWTH).min(BALL_MAX_SPEED)
    }

    /// Respawn the ball at center court with a serve direction drawn from
    /// the fixed angle set, toward a random side.
    pub fn serve<R: Rng>(rng: &mut R) -> Ball {
        let angle = SERVE_ANGLES_DEG[rng.gen_range(0..SERVE_ANGLES_DEG.len())].to_radians();
        let toward_right = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        Ball {
            x: COURT_CENTER,
            y: COURT_CENTER,
            dx: toward_right * angle.cos(),
            dy: angle.sin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ball(x: f32, y: f32, dx: f32, dy: f32) -> Ball {
        Ball { x, y, dx, dy }
    }

    #[test]
    fn advance_moves_along_direction() {
        let mut b = ball(50.0, 50.0, 1.0, 0.0);
        Physics::advance(&mut b, 0.5);
        assert_eq!(b.x, 50.5);
        assert_eq!(b.y, 50.0);
    }

    #[test]
    fn wall_reflection_clamps_and_inverts() {
        let mut b = ball(50.0, -0.4, 0.5, -0.8);
        Physics::reflect_walls(&mut b);
        assert_eq!(b.y, COURT_MIN);
        assert!(b.dy > 0.0, "should head back into the court");

        let mut b = ball(50.0, 100.7, 0.5, 0.8);
        Physics::reflect_walls(&mut b);
        assert_eq!(b.y, COURT_MAX);
        assert!(b.dy < 0.0);
    }

    #[test]
    fn ball_never_leaks_past_rails() {
        // Many steps of a steep trajectory stay within bounds after reflection
        let mut b = ball(50.0, 50.0, 0.2, 0.95);
        for _ in 0..500 {
            Physics::advance(&mut b, BALL_MAX_SPEED);
            Physics::reflect_walls(&mut b);
            assert!((COURT_MIN..=COURT_MAX).contains(&b.y));
        }
    }

    #[test]
    fn paddle_hit_requires_reach_and_approach() {
        // In reach, moving toward the left plane
        let b = ball(4.8, 48.0, -0.9, 0.2);
        assert!(Physics::paddle_hit(&b, 50.0, Side::Player1));

        // Out of reach vertically
        let b = ball(4.8, 30.0, -0.9, 0.2);
        assert!(!Physics::paddle_hit(&b, 50.0, Side::Player1));

        // At the plane but moving away (just bounced)
        let b = ball(4.8, 48.0, 0.9, 0.2);
        assert!(!Physics::paddle_hit(&b, 50.0, Side::Player1));

        // Right side mirror
        let b = ball(95.3, 52.0, 0.9, -0.2);
        assert!(Physics::paddle_hit(&b, 50.0, Side::Player2));
    }

    #[test]
    fn hit_at_exact_paddle_edge_counts() {
        let b = ball(4.0, 60.0, -1.0, 0.0);
        assert!(Physics::paddle_hit(&b, 60.0 - PADDLE_HALF_HEIGHT, Side::Player1));
    }

    #[test]
    fn bounce_center_strike_exits_near_horizontal() {
        let mut b = ball(4.5, 50.0, -0.9, 0.3);
        Physics::bounce(&mut b, 50.0, Side::Player1);
        assert!(b.dx > 0.99, "center strike should exit nearly flat");
        assert!(b.dy.abs() < 0.01);
    }

    #[test]
    fn bounce_edge_strike_is_capped_at_max_angle() {
        // Strike far past the paddle edge; the offset clamps to 1
        let mut b = ball(95.5, 75.0, 0.9, 0.3);
        Physics::bounce(&mut b, 60.0, Side::Player2);

        let angle = b.dy.atan2(b.dx.abs()).to_degrees();
        assert!((angle - MAX_BOUNCE_ANGLE_DEG).abs() < 0.01);
        assert!(b.dx < 0.0, "right paddle sends the ball left");
    }

    #[test]
    fn bounce_direction_is_unit_length() {
        let mut b = ball(4.5, 55.0, -0.9, 0.3);
        Physics::bounce(&mut b, 50.0, Side::Player1);
        let len = (b.dx * b.dx + b.dy * b.dy).sqrt();
        assert!((len - 1.0).abs() < 1e-5);
    }

    #[test]
    fn speed_grows_and_caps() {
        let mut speed = BALL_BASE_SPEED;
        let mut previous = speed;
        for _ in 0..50 {
            speed = Physics::grow_speed(speed);
            assert!(speed >= previous);
            assert!(speed <= BALL_MAX_SPEED);
            previous = speed;
        }
        assert_eq!(speed, BALL_MAX_SPEED);
    }

    #[test]
    fn serve_is_centered_and_never_near_horizontal() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let b = Physics::serve(&mut rng);
            assert_eq!(b.x, COURT_CENTER);
            assert_eq!(b.y, COURT_CENTER);

            let len = (b.dx * b.dx + b.dy * b.dy).sqrt();
            assert!((len - 1.0).abs() < 1e-5);

            // Steepest serve is 60 degrees, shallowest 30
            let angle = b.dy.abs().atan2(b.dx.abs()).to_degrees();
            assert!(angle >= 29.9 && angle <= 60.1);
        }
    }

    #[test]
    fn serve_uses_both_directions() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut left = false;
        let mut right = false;
        for _ in 0..100 {
            let b = Physics::serve(&mut rng);
            if b.dx < 0.0 {
                left = true;
            } else {
                right = true;
            }
        }
        assert!(left && right);
    }
}
