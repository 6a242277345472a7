pub mod binding;
pub mod config;
pub mod controller;
pub mod coords;
pub mod error;
pub mod export;
pub mod geocoder;
pub mod map;
pub mod preferences;
pub mod registry;
pub mod storage;
pub mod store;
pub mod zone;

#[cfg(test)]
mod testing;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
mod webview;

#[cfg(feature = "desktop")]
use commands::*;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::init();

    tauri::Builder::default()
        .setup(|app| {
            init_editor(app.handle())?;
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Map
            map_ready,
            overlay_hovered,
            overlay_unhovered,
            overlay_clicked,
            overlay_path_changed,
            popup_action,
            // Zones
            get_zones,
            get_editor_state,
            toggle_vertex_editing,
            focus_zone,
            fit_all_zones,
            // Drawing
            request_draw,
            acknowledge_help,
            drawing_completed,
            cancel_drawing,
            // Dialogs
            get_attribute_form,
            save_attributes,
            delete_zone_from_dialog,
            cancel_dialog,
            open_manual_create,
            submit_manual_create,
            // Export
            export_zones,
            // View
            get_initial_view,
            get_view_presets,
            set_initial_view,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
