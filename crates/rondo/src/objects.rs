//! # Example Objects
//!
//! Three object kinds exercising the engine end to end:
//!
//! | Object | Priority | Step behaviour                                  |
//! |--------|----------|-------------------------------------------------|
//! | Enemy  | -2       | Loses health, dies at zero                      |
//! | Wall   | 1        | Crumbles a little each step, dies at zero       |
//! | Player | 2        | Walks right, builds a wall every third step     |
//!
//! Enemies run first, players last, in both `step` and `draw`.

use bytemuck::{Pod, Zeroable};
use tracing::info;

use rondo_core::{EngineResult, Handler, HookError, HookResult, Instance, Registry, TemplateIndex};

/// Template index of [`ObjectPlayer`].
pub const PLAYER: TemplateIndex = TemplateIndex(0);
/// Template index of [`ObjectEnemy`].
pub const ENEMY: TemplateIndex = TemplateIndex(1);
/// Template index of [`ObjectWall`].
pub const WALL: TemplateIndex = TemplateIndex(2);

/// Longest player name, including the terminating zero.
pub const MAX_NAME_LENGTH: usize = 20;

/// Health every player and enemy spawns with.
pub const START_HEALTH: f32 = 20.0;

/// Durability every wall spawns with.
pub const START_DURABILITY: i16 = 15;

const ENEMY_DAMAGE_PER_STEP: f32 = 5.0;
const WALL_WEAR_PER_STEP: i16 = 5;
const PLAYER_BUILD_INTERVAL: i32 = 3;

/// Player state.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ObjectPlayer {
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
    /// Remaining health.
    pub health: f32,
    name: [u8; MAX_NAME_LENGTH],
}

impl ObjectPlayer {
    /// Returns the player's name, empty if unset.
    #[must_use]
    pub fn name(&self) -> &str {
        let end = self
            .name
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(MAX_NAME_LENGTH);
        std::str::from_utf8(&self.name[..end]).unwrap_or_default()
    }

    /// Sets the player's name, truncated to fit on a character boundary.
    pub fn set_name(&mut self, name: &str) {
        let mut end = name.len().min(MAX_NAME_LENGTH - 1);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        self.name = [0; MAX_NAME_LENGTH];
        self.name[..end].copy_from_slice(&name.as_bytes()[..end]);
    }
}

/// Enemy state.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ObjectEnemy {
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
    /// Remaining health.
    pub health: f32,
    /// Non-zero once the enemy has died.
    pub dead: u32,
}

/// Wall state.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ObjectWall {
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
    /// Hits left before the wall falls.
    pub durability: i16,
    _reserved: i16,
}

fn state<T: Pod>(instance: &mut Instance) -> Result<&mut T, HookError> {
    let template = instance.template();
    instance
        .data_mut::<T>()
        .ok_or_else(|| HookError::new(format!("template {template} has no matching state")))
}

fn player_ctor(instance: &mut Instance) -> HookResult {
    let player = state::<ObjectPlayer>(instance)?;
    player.health = START_HEALTH;
    Ok(())
}

fn player_dtor(instance: &mut Instance) -> HookResult {
    state::<ObjectPlayer>(instance)?.set_name("");
    Ok(())
}

fn enemy_ctor(instance: &mut Instance) -> HookResult {
    let enemy = state::<ObjectEnemy>(instance)?;
    enemy.health = START_HEALTH;
    enemy.dead = 0;
    Ok(())
}

fn wall_ctor(instance: &mut Instance) -> HookResult {
    state::<ObjectWall>(instance)?.durability = START_DURABILITY;
    Ok(())
}

/// Dispatch priority of the example objects.
#[must_use]
pub fn priority(index: TemplateIndex) -> i32 {
    match index {
        PLAYER => 2,
        ENEMY => -2,
        WALL => 1,
        _ => 0,
    }
}

/// Registers the three templates and their hooks.
///
/// # Errors
///
/// Returns [`rondo_core::EngineError::DuplicateTemplate`] if any of the
/// indices is already taken.
pub fn register(registry: &mut Registry) -> EngineResult<()> {
    registry.add_template_of::<ObjectPlayer>(PLAYER)?;
    registry.add_template_of::<ObjectEnemy>(ENEMY)?;
    registry.add_template_of::<ObjectWall>(WALL)?;

    registry.set_constructor(PLAYER, Some(player_ctor));
    registry.set_destructor(PLAYER, Some(player_dtor));
    registry.set_constructor(ENEMY, Some(enemy_ctor));
    registry.set_constructor(WALL, Some(wall_ctor));
    Ok(())
}

/// Binds the `step` behaviour of every example object.
pub fn bind_step(handler: &mut Handler) {
    handler.bind(PLAYER, |ctx| {
        let player = ctx
            .state_mut::<ObjectPlayer>()
            .ok_or_else(|| HookError::new("player state missing"))?;
        player.x += 1;
        let (x, y) = (player.x, player.y);

        if x % PLAYER_BUILD_INTERVAL == 0 {
            let wall = ctx.spawn(WALL)?;
            if let Some(wall) = ctx.registry_mut().state_mut::<ObjectWall>(wall) {
                wall.x = x;
                wall.y = y + 1;
            }
        }
        Ok(())
    });

    handler.bind(ENEMY, |ctx| {
        let enemy = ctx
            .state_mut::<ObjectEnemy>()
            .ok_or_else(|| HookError::new("enemy state missing"))?;
        enemy.health -= ENEMY_DAMAGE_PER_STEP;
        if enemy.health <= 0.0 {
            enemy.dead = 1;
            ctx.kill_self()?;
        }
        Ok(())
    });

    handler.bind(WALL, |ctx| {
        let wall = ctx
            .state_mut::<ObjectWall>()
            .ok_or_else(|| HookError::new("wall state missing"))?;
        wall.durability -= WALL_WEAR_PER_STEP;
        if wall.durability <= 0 {
            ctx.kill_self()?;
        }
        Ok(())
    });
}

/// Binds the `draw` behaviour: every object logs where it is.
pub fn bind_draw(handler: &mut Handler) {
    handler.bind(PLAYER, |ctx| {
        if let Some(player) = ctx.state::<ObjectPlayer>() {
            info!(
                "player {} '{}' at ({}, {}) health {:.1}",
                ctx.id(),
                player.name(),
                player.x,
                player.y,
                player.health
            );
        }
        Ok(())
    });

    handler.bind(ENEMY, |ctx| {
        if let Some(enemy) = ctx.state::<ObjectEnemy>() {
            info!(
                "enemy {} at ({}, {}) health {:.1}",
                ctx.id(),
                enemy.x,
                enemy.y,
                enemy.health
            );
        }
        Ok(())
    });

    handler.bind(WALL, |ctx| {
        if let Some(wall) = ctx.state::<ObjectWall>() {
            info!(
                "wall {} at ({}, {}) durability {}",
                ctx.id(),
                wall.x,
                wall.y,
                wall.durability
            );
        }
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rondo_core::EngineConfig;

    fn registry() -> Registry {
        let mut registry = Registry::with_config(&EngineConfig::compact()).unwrap();
        register(&mut registry).unwrap();
        registry
    }

    #[test]
    fn test_templates_named_after_state() {
        let registry = registry();
        assert_eq!(registry.template_name(PLAYER), Some("ObjectPlayer"));
        assert_eq!(registry.template_name(ENEMY), Some("ObjectEnemy"));
        assert_eq!(registry.template_name(WALL), Some("ObjectWall"));
        assert_eq!(registry.template(PLAYER).unwrap().size(), 32);
        assert_eq!(registry.template(WALL).unwrap().size(), 12);
    }

    #[test]
    fn test_constructors_initialise_state() {
        let mut registry = registry();
        let player = registry.spawn(PLAYER).unwrap();
        let enemy = registry.spawn(ENEMY).unwrap();
        let wall = registry.spawn(WALL).unwrap();

        let player = registry.state::<ObjectPlayer>(player).unwrap();
        assert!((player.health - START_HEALTH).abs() < f32::EPSILON);
        assert_eq!(player.name(), "");
        assert!((registry.state::<ObjectEnemy>(enemy).unwrap().health - START_HEALTH).abs() < f32::EPSILON);
        assert_eq!(registry.state::<ObjectWall>(wall).unwrap().durability, START_DURABILITY);
    }

    #[test]
    fn test_player_name_truncates() {
        let mut player = ObjectPlayer::zeroed();
        player.set_name("Ada");
        assert_eq!(player.name(), "Ada");

        player.set_name("a name far longer than twenty bytes");
        assert_eq!(player.name().len(), MAX_NAME_LENGTH - 1);

        // 'é' is two bytes and straddles the cut.
        player.set_name("ééééééééééé");
        assert_eq!(player.name(), "ééééééééé");
    }

    #[test]
    fn test_enemy_dies_after_four_steps() {
        let mut registry = registry();
        let mut step = Handler::with_priority(&mut registry, priority).unwrap();
        bind_step(&mut step);
        let enemy = registry.spawn(ENEMY).unwrap();

        for _ in 0..3 {
            assert_eq!(step.run(&mut registry).unwrap(), 0);
            assert!(registry.is_alive(enemy));
        }
        step.run(&mut registry).unwrap();
        assert!(!registry.is_alive(enemy));
        assert_eq!(step.active_len(), 0);
    }

    #[test]
    fn test_player_builds_walls() {
        let mut registry = registry();
        let mut step = Handler::with_priority(&mut registry, priority).unwrap();
        bind_step(&mut step);
        let player = registry.spawn(PLAYER).unwrap();

        for _ in 0..3 {
            step.run(&mut registry).unwrap();
        }
        assert_eq!(registry.state::<ObjectPlayer>(player).unwrap().x, 3);
        assert_eq!(registry.alive_count(), 2);

        let wall = registry
            .iter_alive()
            .find(|instance| instance.template() == WALL)
            .map(Instance::id)
            .unwrap();
        let wall = registry.state::<ObjectWall>(wall).unwrap();
        assert_eq!((wall.x, wall.y), (3, 1));
        assert_eq!(wall.durability, START_DURABILITY);

        // Walls run before the player, so the new wall is worn next step.
        let order: Vec<TemplateIndex> = step
            .active_ids()
            .map(|id| registry.instance(id).unwrap().template())
            .collect();
        assert_eq!(order, vec![WALL, PLAYER]);
    }
}
