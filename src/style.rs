//! Shared appearance of every figure.

use {
    anyhow::{ensure, Context, Result},
    log::{debug, info},
    plotters::style::RGBColor,
    serde::Deserialize,
    std::{
        env, fs,
        path::{Path, PathBuf},
    },
};

/// Environment variable pointing at the directory holding `styles/flowpost.yaml`
pub const SCRIPTS_VARIABLE: &str = "SCRIPTS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Style {
    /// Width and height in inches
    pub figure_size: [f64; 2],
    pub dpi: u32,
    pub font_family: String,
    pub font_size: f64,
    pub line_width: u32,
    /// Colours of successive series, as `[r, g, b]`
    pub palette: Vec<[u8; 3]>,
    pub grid: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            figure_size: [8.0, 6.0],
            dpi: 100,
            font_family: "sans-serif".to_owned(),
            font_size: 16.0,
            line_width: 2,
            palette: vec![
                [31, 119, 180],
                [255, 127, 14],
                [44, 160, 44],
                [214, 39, 40],
                [148, 103, 189],
                [140, 86, 75],
            ],
            grid: true,
        }
    }
}

impl Style {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open style sheet {}", path.display()))?;
        let style = serde_yaml::from_reader::<_, Style>(file)
            .with_context(|| format!("Failed to parse style sheet {}", path.display()))?;
        ensure!(!style.palette.is_empty(), "{}: empty palette", path.display());
        info!("Using the style sheet {}", path.display());

        Ok(style)
    }

    /// Style sheet given in the parameters, else the shared one under `$SCRIPTS`, else the
    /// built-in style.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::read(path);
        }

        match shared_style_sheet(env::var_os(SCRIPTS_VARIABLE).map(PathBuf::from)) {
            Some(path) => Self::read(path),
            None => {
                debug!("No style sheet found, using the default style");
                Ok(Self::default())
            }
        }
    }

    /// Size of the image in pixels
    pub fn pixels(&self) -> (u32, u32) {
        (
            (self.figure_size[0] * f64::from(self.dpi)).round() as u32,
            (self.figure_size[1] * f64::from(self.dpi)).round() as u32,
        )
    }

    /// Colour of the `index`-th series, cycling through the palette
    pub fn color(&self, index: usize) -> RGBColor {
        let [r, g, b] = self.palette[index % self.palette.len()];
        RGBColor(r, g, b)
    }

    pub fn font(&self) -> (&str, f64) {
        (self.font_family.as_str(), self.font_size)
    }
}

fn shared_style_sheet(scripts: Option<PathBuf>) -> Option<PathBuf> {
    let path = scripts?.join("styles").join("flowpost.yaml");
    if path.is_file() {
        Some(path)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use {super::*, tempdir::TempDir};

    #[test]
    fn partial_style_sheet() {
        let dir = TempDir::new("flowpost").unwrap();
        let path = dir.path().join("style.yaml");
        fs::write(&path, "dpi: 200\npalette: [[0, 0, 0]]\ngrid: false\n").unwrap();

        let style = Style::load(Some(&path)).unwrap();
        assert_eq!(style.pixels(), (1600, 1200));
        assert_eq!(style.color(3), RGBColor(0, 0, 0));
        assert!(!style.grid);
        assert_eq!(style.font(), ("sans-serif", 16.0));
    }

    #[test]
    fn empty_palette() {
        let dir = TempDir::new("flowpost").unwrap();
        let path = dir.path().join("style.yaml");
        fs::write(&path, "palette: []\n").unwrap();

        assert!(Style::read(&path).is_err());
    }

    #[test]
    fn shared_sheet_lookup() {
        let dir = TempDir::new("flowpost").unwrap();
        assert_eq!(shared_style_sheet(Some(dir.path().to_owned())), None);
        assert_eq!(shared_style_sheet(None), None);

        fs::create_dir(dir.path().join("styles")).unwrap();
        fs::write(dir.path().join("styles").join("flowpost.yaml"), "dpi: 50\n").unwrap();
        assert_eq!(
            shared_style_sheet(Some(dir.path().to_owned())),
            Some(dir.path().join("styles").join("flowpost.yaml"))
        );
    }
}
