use crate::game::constants::level::PLATFORMS;
use crate::game::constants::physics::{GRAVITY, LANDING_TOLERANCE};
use crate::game::state::Fighter;
use crate::util::vec2::Rect;

/// Integrate gravity for one tick and resolve platform landings.
/// Dead fighters are frozen in place.
pub fn update(fighter: &mut Fighter) {
    update_with(fighter, &PLATFORMS);
}

/// Same as [`update`] against an explicit platform list
pub fn update_with(fighter: &mut Fighter, platforms: &[Rect]) {
    if fighter.dead {
        return;
    }

    fighter.velocity.y += GRAVITY;
    fighter.position.y += fighter.velocity.y;
    fighter.on_ground = false;

    if let Some(platform) = platforms
        .iter()
        .find(|platform| lands_on(fighter, platform))
    {
        fighter.position.y = platform.y - fighter.hurtbox().h;
        fighter.velocity.y = 0.0;
        fighter.on_ground = true;
    }
}

/// One-sided landing test: descending, feet at or below the surface now,
/// and the previous foot position no more than the tolerance below it.
fn lands_on(fighter: &Fighter, platform: &Rect) -> bool {
    let body = fighter.hurtbox();
    let feet = body.bottom();
    let previous_feet = feet - fighter.velocity.y;

    fighter.velocity.y >= 0.0
        && feet >= platform.y
        && previous_feet <= platform.y + LANDING_TOLERANCE
        && body.right() > platform.x
        && body.x < platform.right()
}
