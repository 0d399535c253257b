use bevy::prelude::*;
use leafwing_input_manager::prelude::*;

#[derive(Reflect, Actionlike, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputAction {
    /// Hit whatever is under the cursor.
    Strike,
    #[actionlike(DualAxis)]
    Move,
    Spawn,
    NextStructure,
    Attract,
    Clear,
}

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(InputManagerPlugin::<InputAction>::default());

    app.register_type::<InputAction>();

    let mut input_map = InputMap::<InputAction>::default();
    input_map.insert(InputAction::Strike, MouseButton::Left);
    input_map.insert(InputAction::Spawn, KeyCode::KeyF);
    input_map.insert(InputAction::NextStructure, KeyCode::Tab);
    input_map.insert(InputAction::Attract, KeyCode::KeyG);
    input_map.insert(InputAction::Clear, KeyCode::KeyX);
    input_map.insert_dual_axis(InputAction::Move, VirtualDPad::wasd());
    app.insert_resource(input_map);
    app.insert_resource(ActionState::<InputAction>::default());
}
