use eframe::egui;
use egui::Color32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThemeMode {
    Light,
    Dark,
}

pub struct ColorPalette;

impl ColorPalette {
    pub const BLUE_400: Color32 = Color32::from_rgb(96, 165, 250);
    pub const BLUE_500: Color32 = Color32::from_rgb(59, 130, 246);
    pub const BLUE_600: Color32 = Color32::from_rgb(37, 99, 235);

    pub const SLATE_100: Color32 = Color32::from_rgb(241, 245, 249);
    pub const SLATE_200: Color32 = Color32::from_rgb(226, 232, 240);

    pub const GRAY_50: Color32 = Color32::from_rgb(249, 250, 251);
    pub const GRAY_100: Color32 = Color32::from_rgb(243, 244, 246);
    pub const GRAY_200: Color32 = Color32::from_rgb(229, 231, 235);
    pub const GRAY_300: Color32 = Color32::from_rgb(209, 213, 219);
    pub const GRAY_400: Color32 = Color32::from_rgb(156, 163, 175);
    pub const GRAY_600: Color32 = Color32::from_rgb(75, 85, 99);
    pub const GRAY_800: Color32 = Color32::from_rgb(31, 41, 55);
    pub const GRAY_900: Color32 = Color32::from_rgb(17, 24, 39);

    pub const ZINC_100: Color32 = Color32::from_rgb(244, 244, 245);
    pub const ZINC_400: Color32 = Color32::from_rgb(161, 161, 170);
    pub const ZINC_500: Color32 = Color32::from_rgb(113, 113, 122);
    pub const ZINC_600: Color32 = Color32::from_rgb(82, 82, 91);
    pub const ZINC_700: Color32 = Color32::from_rgb(63, 63, 70);
    pub const ZINC_800: Color32 = Color32::from_rgb(39, 39, 42);
    pub const ZINC_900: Color32 = Color32::from_rgb(24, 24, 27);

    pub const GREEN_400: Color32 = Color32::from_rgb(74, 222, 128);
    pub const GREEN_600: Color32 = Color32::from_rgb(22, 163, 74);

    pub const RED_400: Color32 = Color32::from_rgb(248, 113, 113);
    pub const RED_600: Color32 = Color32::from_rgb(220, 38, 38);

    pub const AMBER_400: Color32 = Color32::from_rgb(251, 191, 36);
    pub const AMBER_600: Color32 = Color32::from_rgb(217, 119, 6);
}

/// Text colors for status lines and dialog headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accent {
    Info,
    Busy,
    Success,
    Warning,
    Error,
}

/// Dark themes get the lighter shade so the text stays readable.
pub fn accent(theme: ThemeMode, accent: Accent) -> Color32 {
    let dark = theme == ThemeMode::Dark;
    match accent {
        Accent::Info if dark => ColorPalette::BLUE_400,
        Accent::Info => ColorPalette::BLUE_600,
        Accent::Busy | Accent::Warning if dark => ColorPalette::AMBER_400,
        Accent::Busy | Accent::Warning => ColorPalette::AMBER_600,
        Accent::Success if dark => ColorPalette::GREEN_400,
        Accent::Success => ColorPalette::GREEN_600,
        Accent::Error if dark => ColorPalette::RED_400,
        Accent::Error => ColorPalette::RED_600,
    }
}

pub fn muted_text(theme: ThemeMode) -> Color32 {
    match theme {
        ThemeMode::Dark => ColorPalette::ZINC_400,
        ThemeMode::Light => ColorPalette::GRAY_600,
    }
}

pub struct ModalColors {
    pub background: Color32,
    pub border: Color32,
    pub text: Color32,
    pub overlay: Color32,
}

pub fn modal_colors(theme: ThemeMode) -> ModalColors {
    match theme {
        ThemeMode::Dark => ModalColors {
            background: ColorPalette::ZINC_800,
            border: ColorPalette::ZINC_700,
            text: ColorPalette::ZINC_100,
            overlay: Color32::from_rgba_premultiplied(0, 0, 0, 200),
        },
        ThemeMode::Light => ModalColors {
            background: Color32::WHITE,
            border: ColorPalette::GRAY_300,
            text: ColorPalette::GRAY_900,
            overlay: Color32::from_rgba_premultiplied(0, 0, 0, 150),
        },
    }
}

// fill, border, text
type Shade = (Color32, Color32, Color32);

struct Surfaces {
    dark_mode: bool,
    panel: Color32,
    field: Color32,
    /// Labels and other non-interactive widgets.
    idle: Shade,
    inactive: Shade,
    hovered: Shade,
    active: Shade,
    selection: Color32,
}

fn surfaces(theme: ThemeMode) -> Surfaces {
    match theme {
        ThemeMode::Dark => Surfaces {
            dark_mode: true,
            panel: ColorPalette::ZINC_900,
            field: Color32::from_rgb(12, 12, 15),
            idle: (ColorPalette::ZINC_800, ColorPalette::ZINC_700, ColorPalette::SLATE_200),
            inactive: (ColorPalette::ZINC_800, ColorPalette::ZINC_600, ColorPalette::SLATE_200),
            hovered: (ColorPalette::ZINC_700, ColorPalette::ZINC_500, ColorPalette::SLATE_100),
            active: (ColorPalette::ZINC_600, ColorPalette::ZINC_400, Color32::WHITE),
            selection: Color32::from_rgba_premultiplied(60, 120, 240, 100),
        },
        ThemeMode::Light => Surfaces {
            dark_mode: false,
            panel: ColorPalette::GRAY_50,
            field: Color32::WHITE,
            idle: (Color32::WHITE, ColorPalette::GRAY_300, ColorPalette::GRAY_800),
            inactive: (ColorPalette::GRAY_100, ColorPalette::GRAY_300, ColorPalette::GRAY_800),
            hovered: (ColorPalette::GRAY_200, ColorPalette::GRAY_400, ColorPalette::GRAY_900),
            active: (ColorPalette::GRAY_300, ColorPalette::GRAY_400, Color32::BLACK),
            selection: Color32::from_rgba_premultiplied(60, 120, 240, 80),
        },
    }
}

fn paint_widget(widget: &mut egui::style::WidgetVisuals, (fill, border, text): Shade) {
    widget.bg_fill = fill;
    widget.weak_bg_fill = fill;
    widget.bg_stroke = egui::Stroke::new(1.0, border);
    widget.fg_stroke = egui::Stroke::new(1.0, text);
    widget.corner_radius = egui::CornerRadius::same(4);
}

pub fn apply_theme(ctx: &egui::Context, theme: ThemeMode) {
    let mut style = (*ctx.style()).clone();
    let colors = surfaces(theme);

    style.spacing.item_spacing = egui::vec2(8.0, 8.0);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);

    let visuals = &mut style.visuals;
    visuals.dark_mode = colors.dark_mode;
    visuals.panel_fill = colors.panel;
    visuals.window_fill = colors.panel;
    visuals.extreme_bg_color = colors.field;
    visuals.selection.bg_fill = colors.selection;
    visuals.selection.stroke = egui::Stroke::new(1.0, colors.active.2);

    paint_widget(&mut visuals.widgets.noninteractive, colors.idle);
    paint_widget(&mut visuals.widgets.inactive, colors.inactive);
    paint_widget(&mut visuals.widgets.hovered, colors.hovered);
    paint_widget(&mut visuals.widgets.active, colors.active);

    ctx.set_style(style);
}

struct ButtonLook {
    fill: Color32,
    hover_fill: Color32,
    border: Option<Color32>,
    text: Color32,
}

fn styled_button(ui: &mut egui::Ui, button: egui::Button<'_>, look: ButtonLook) -> egui::Response {
    ui.scope(|ui| {
        let stroke = look.border.map_or(egui::Stroke::NONE, |c| egui::Stroke::new(1.0, c));
        let widgets = &mut ui.style_mut().visuals.widgets;
        for (state, fill) in [
            (&mut widgets.inactive, look.fill),
            (&mut widgets.hovered, look.hover_fill),
            (&mut widgets.active, look.fill),
        ] {
            state.bg_fill = fill;
            state.weak_bg_fill = fill;
            state.bg_stroke = stroke;
            state.fg_stroke = egui::Stroke::new(1.0, look.text);
        }
        ui.add(button)
    })
    .inner
}

/// Full-width call to action. Blue in both themes.
pub fn primary_button(ui: &mut egui::Ui, text: &str) -> egui::Response {
    let button = egui::Button::new(egui::RichText::new(text).size(16.0))
        .min_size(egui::vec2(ui.available_width(), 40.0));
    let look = ButtonLook {
        fill: ColorPalette::BLUE_600,
        hover_fill: ColorPalette::BLUE_500,
        border: None,
        text: Color32::WHITE,
    };
    styled_button(ui, button, look)
}

/// Dialog dismiss button.
pub fn secondary_button(ui: &mut egui::Ui, text: &str, theme: ThemeMode) -> egui::Response {
    let button = egui::Button::new(egui::RichText::new(text).size(14.0)).min_size(egui::vec2(96.0, 32.0));
    let look = match theme {
        ThemeMode::Dark => ButtonLook {
            fill: ColorPalette::ZINC_800,
            hover_fill: ColorPalette::ZINC_700,
            border: Some(ColorPalette::ZINC_600),
            text: ColorPalette::SLATE_200,
        },
        ThemeMode::Light => ButtonLook {
            fill: Color32::WHITE,
            hover_fill: ColorPalette::GRAY_50,
            border: Some(ColorPalette::GRAY_300),
            text: ColorPalette::GRAY_800,
        },
    };
    styled_button(ui, button, look)
}
