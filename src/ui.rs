//! A small tweak panel: folders of sliders bound to live values.
//!
//! Each [`Slider`] reads and writes its value through a [`SliderBinding`],
//! so the panel holds no copies of the data it edits. A [`MaterialBinding`]
//! points at one scalar of a material in the shared library; moving the
//! slider changes the material every object using it is drawn with.
//!
//! ```ignore
//! let panel = ctx.gui();
//! let folder = panel.add_folder("Material Controls");
//! folder.add(metalness_binding, 0.0, 1.0).step(0.01).name("Metalness");
//! folder.open();
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::material::{MaterialId, MaterialParam, Materials};

/// Read/write access to the value a slider controls.
pub trait SliderBinding {
    fn get(&self) -> f64;
    fn set(&self, value: f64);
}

impl SliderBinding for Rc<Cell<f64>> {
    fn get(&self) -> f64 {
        Cell::get(self)
    }

    fn set(&self, value: f64) {
        Cell::set(self, value);
    }
}

/// Binds one scalar parameter of a material in a shared library.
#[derive(Clone, Debug)]
pub struct MaterialBinding {
    materials: Rc<RefCell<Materials>>,
    id: MaterialId,
    param: MaterialParam,
}

impl MaterialBinding {
    pub fn new(materials: Rc<RefCell<Materials>>, id: MaterialId, param: MaterialParam) -> Self {
        Self {
            materials,
            id,
            param,
        }
    }
}

impl SliderBinding for MaterialBinding {
    fn get(&self) -> f64 {
        self.materials
            .borrow()
            .get(self.id)
            .map(|m| m.get(self.param) as f64)
            .unwrap_or(0.0)
    }

    fn set(&self, value: f64) {
        if let Some(material) = self.materials.borrow_mut().get_mut(self.id) {
            material.set(self.param, value as f32);
        }
    }
}

/// A labelled numeric slider.
pub struct Slider {
    label: String,
    min: f64,
    max: f64,
    step: Option<f64>,
    binding: Box<dyn SliderBinding>,
}

impl Slider {
    pub fn new(binding: impl SliderBinding + 'static, min: f64, max: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            label: String::new(),
            min,
            max,
            step: None,
            binding: Box::new(binding),
        }
    }

    /// Display label.
    pub fn name(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = label.into();
        self
    }

    /// Snap values to multiples of `step` above `min`. Non-positive steps
    /// disable snapping.
    pub fn step(&mut self, step: f64) -> &mut Self {
        self.step = (step > 0.0).then_some(step);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Clamp to the range, then snap to the step grid.
    pub fn quantize(&self, value: f64) -> f64 {
        let value = if value.is_nan() { self.min } else { value };
        let value = value.clamp(self.min, self.max);
        match self.step {
            Some(step) => {
                let snapped = self.min + ((value - self.min) / step).round() * step;
                snapped.clamp(self.min, self.max)
            }
            None => value,
        }
    }

    /// The bound value.
    pub fn value(&self) -> f64 {
        self.binding.get()
    }

    /// Quantize `value` and write it through the binding.
    pub fn set_value(&self, value: f64) {
        self.binding.set(self.quantize(value));
    }

    fn ui(&self, ui: &mut egui::Ui) {
        let mut value = self.value();
        let mut slider = egui::Slider::new(&mut value, self.min..=self.max).text(self.label.as_str());
        if let Some(step) = self.step {
            slider = slider.step_by(step);
        }
        if ui.add(slider).changed() {
            self.set_value(value);
        }
    }
}

/// A collapsible group of sliders.
pub struct Folder {
    title: String,
    open: bool,
    sliders: Vec<Slider>,
}

impl Folder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            open: false,
            sliders: Vec::new(),
        }
    }

    /// Add a slider over `[min, max]` and return it for further setup.
    pub fn add(&mut self, binding: impl SliderBinding + 'static, min: f64, max: f64) -> &mut Slider {
        self.sliders.push(Slider::new(binding, min, max));
        let last = self.sliders.len() - 1;
        &mut self.sliders[last]
    }

    /// Expand the folder when first shown.
    pub fn open(&mut self) -> &mut Self {
        self.open = true;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn sliders(&self) -> &[Slider] {
        &self.sliders
    }

    /// The first slider labelled `label`.
    pub fn slider(&self, label: &str) -> Option<&Slider> {
        self.sliders.iter().find(|s| s.label == label)
    }
}

/// The on-screen panel: a titled window of folders pinned to the top right.
pub struct ControlPanel {
    title: String,
    folders: Vec<Folder>,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new("Controls")
    }
}

impl ControlPanel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            folders: Vec::new(),
        }
    }

    pub fn add_folder(&mut self, title: impl Into<String>) -> &mut Folder {
        self.folders.push(Folder::new(title));
        let last = self.folders.len() - 1;
        &mut self.folders[last]
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn folder(&self, title: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.title == title)
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Lay the panel out for this egui frame.
    pub fn show(&self, ctx: &egui::Context) {
        if self.is_empty() {
            return;
        }
        egui::Window::new(self.title.as_str())
            .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
            .resizable(false)
            .show(ctx, |ui| {
                for folder in &self.folders {
                    egui::CollapsingHeader::new(folder.title.as_str())
                        .default_open(folder.open)
                        .show(ui, |ui| {
                            for slider in &folder.sliders {
                                slider.ui(ui);
                            }
                        });
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::StandardMaterial;

    fn shared_material() -> (Rc<RefCell<Materials>>, MaterialId) {
        let materials = Rc::new(RefCell::new(Materials::new()));
        let id = materials
            .borrow_mut()
            .add(StandardMaterial::new().metalness(0.7).roughness(0.2));
        (materials, id)
    }

    #[test]
    fn quantize_clamps_and_snaps() {
        let mut slider = Slider::new(Rc::new(Cell::new(0.0)), 0.0, 1.0);
        slider.step(0.01);
        assert_eq!(slider.quantize(1.5), 1.0);
        assert_eq!(slider.quantize(-3.0), 0.0);
        assert!((slider.quantize(0.123) - 0.12).abs() < 1e-12);
        assert!((slider.quantize(0.456) - 0.46).abs() < 1e-12);
        assert_eq!(slider.quantize(f64::NAN), 0.0);
    }

    #[test]
    fn quantize_without_step_only_clamps() {
        let slider = Slider::new(Rc::new(Cell::new(0.0)), -2.0, 2.0);
        assert_eq!(slider.quantize(0.333), 0.333);
        assert_eq!(slider.quantize(9.0), 2.0);
    }

    #[test]
    fn reversed_range_is_normalized() {
        let slider = Slider::new(Rc::new(Cell::new(0.0)), 1.0, 0.0);
        assert_eq!(slider.range(), (0.0, 1.0));
    }

    #[test]
    fn material_slider_writes_through() {
        let (materials, id) = shared_material();
        let mut panel = ControlPanel::default();
        let folder = panel.add_folder("Material Controls");
        folder
            .add(
                MaterialBinding::new(materials.clone(), id, MaterialParam::Metalness),
                0.0,
                1.0,
            )
            .step(0.01)
            .name("Metalness");
        folder
            .add(
                MaterialBinding::new(materials.clone(), id, MaterialParam::Roughness),
                0.0,
                1.0,
            )
            .step(0.01)
            .name("Roughness");
        folder.open();

        let folder = panel.folder("Material Controls").unwrap();
        assert!(folder.is_open());

        let metalness = folder.slider("Metalness").unwrap();
        assert!((metalness.value() - 0.7).abs() < 1e-6);

        for v in [0.0, 0.25, 0.5, 0.99, 1.0] {
            metalness.set_value(v);
            assert_eq!(materials.borrow().get(id).unwrap().metalness, v as f32);
        }

        folder.slider("Roughness").unwrap().set_value(0.8);
        let material = materials.borrow().get(id).cloned().unwrap();
        assert_eq!(material.roughness, 0.8);
        assert_eq!(material.metalness, 1.0);
    }

    #[test]
    fn slider_reads_external_edits() {
        let (materials, id) = shared_material();
        let binding = MaterialBinding::new(materials.clone(), id, MaterialParam::Roughness);
        let slider = Slider::new(binding, 0.0, 1.0);

        materials.borrow_mut().get_mut(id).unwrap().roughness = 0.45;
        assert!((slider.value() - 0.45).abs() < 1e-6);
    }

    #[test]
    fn folders_start_closed() {
        let mut panel = ControlPanel::new("Controls");
        assert!(panel.is_empty());
        let folder = panel.add_folder("Extras");
        assert!(!folder.is_open());
        assert_eq!(folder.title(), "Extras");
    }
}
