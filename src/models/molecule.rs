//! # 分子结构数据模型
//!
//! 定义计算请求中的分子：元素符号、笛卡尔坐标（内部统一为 Bohr）、
//! 电荷与自旋多重度。
//!
//! ## 支持的文本格式
//! ```text
//!  # R=1.008 #A=105.0
//!  0 2
//!  N   0.000000000000000   0.000000000000000  -0.145912918634892
//!  H   0.000000000000000  -1.511214298139000   1.013682596946108
//!  H   0.000000000000000   1.511214298139000   1.013682596946108
//!  units au
//! ```
//!
//! ## 依赖关系
//! - 被 `models/request.rs`, `harness/` 使用
//! - 无外部模块依赖

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bohr -> Angstrom 换算因子 (CODATA 2014)
pub const BOHR_TO_ANGSTROM: f64 = 0.52917721067;

/// 元素符号表，下标 + 1 即原子序数
const ELEMENTS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// 查询原子序数（大小写不敏感）
pub fn atomic_number(symbol: &str) -> Option<u32> {
    ELEMENTS
        .iter()
        .position(|el| el.eq_ignore_ascii_case(symbol))
        .map(|i| i as u32 + 1)
}

/// 规范化元素符号："he" -> "He"
pub fn normalize_symbol(symbol: &str) -> Option<String> {
    atomic_number(symbol).map(|z| ELEMENTS[z as usize - 1].to_string())
}

/// 分子
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MoleculeInput")]
pub struct Molecule {
    /// 可选名称
    pub name: Option<String>,

    /// 元素符号
    pub symbols: Vec<String>,

    /// 笛卡尔坐标 (Bohr)
    pub geometry: Vec<[f64; 3]>,

    /// 分子电荷
    pub molecular_charge: i32,

    /// 自旋多重度 (2S+1)
    pub molecular_multiplicity: u32,
}

/// JSON 中的分子可以是文本块，也可以是结构化记录
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MoleculeInput {
    Text(String),
    Record(MoleculeRecord),
}

#[derive(Debug, Deserialize)]
struct MoleculeRecord {
    #[serde(default)]
    name: Option<String>,
    symbols: Vec<String>,
    /// 扁平或按原子分组均可，单位 Bohr
    geometry: GeometryInput,
    #[serde(default)]
    molecular_charge: i32,
    #[serde(default)]
    molecular_multiplicity: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeometryInput {
    Nested(Vec<[f64; 3]>),
    Flat(Vec<f64>),
}

impl TryFrom<MoleculeInput> for Molecule {
    type Error = HarnessError;

    fn try_from(input: MoleculeInput) -> Result<Self> {
        match input {
            MoleculeInput::Text(text) => Molecule::from_text(&text),
            MoleculeInput::Record(rec) => {
                let geometry = match rec.geometry {
                    GeometryInput::Nested(g) => g,
                    GeometryInput::Flat(flat) => {
                        if flat.len() % 3 != 0 {
                            return Err(HarnessError::ParseError {
                                what: "molecule".to_string(),
                                reason: format!(
                                    "flat geometry length {} is not a multiple of 3",
                                    flat.len()
                                ),
                            });
                        }
                        flat.chunks(3).map(|c| [c[0], c[1], c[2]]).collect()
                    }
                };
                let mut mol = Molecule::new(rec.symbols, geometry)?;
                mol.name = rec.name;
                mol.with_charge_and_multiplicity(rec.molecular_charge, rec.molecular_multiplicity)
            }
        }
    }
}

impl Molecule {
    /// 由符号和 Bohr 坐标创建中性、最低自旋的分子
    pub fn new(symbols: Vec<String>, geometry: Vec<[f64; 3]>) -> Result<Self> {
        if symbols.len() != geometry.len() {
            return Err(HarnessError::ParseError {
                what: "molecule".to_string(),
                reason: format!(
                    "{} symbols but {} coordinates",
                    symbols.len(),
                    geometry.len()
                ),
            });
        }
        if symbols.is_empty() {
            return Err(HarnessError::ParseError {
                what: "molecule".to_string(),
                reason: "no atoms".to_string(),
            });
        }

        let symbols = symbols
            .iter()
            .map(|s| {
                normalize_symbol(s).ok_or_else(|| HarnessError::ParseError {
                    what: "molecule".to_string(),
                    reason: format!("unknown element symbol '{}'", s),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mol = Molecule {
            name: None,
            symbols,
            geometry,
            molecular_charge: 0,
            molecular_multiplicity: 1,
        };
        mol.with_charge_and_multiplicity(0, None)
    }

    /// 设置电荷与多重度；未给出多重度时取最低自旋
    pub fn with_charge_and_multiplicity(
        mut self,
        charge: i32,
        multiplicity: Option<u32>,
    ) -> Result<Self> {
        let nelec = self.nuclear_charge() as i64 - charge as i64;
        if nelec < 0 {
            return Err(HarnessError::ParseError {
                what: "molecule".to_string(),
                reason: format!("charge {} leaves a negative electron count", charge),
            });
        }

        let mult = multiplicity.unwrap_or(if nelec % 2 == 0 { 1 } else { 2 });
        if mult == 0 {
            return Err(HarnessError::ParseError {
                what: "molecule".to_string(),
                reason: "multiplicity must be at least 1".to_string(),
            });
        }

        // 未配对电子数与总电子数奇偶性必须一致
        let nopen = mult as i64 - 1;
        if nopen > nelec || (nelec - nopen) % 2 != 0 {
            return Err(HarnessError::ParseError {
                what: "molecule".to_string(),
                reason: format!(
                    "multiplicity {} is inconsistent with {} electrons",
                    mult, nelec
                ),
            });
        }

        self.molecular_charge = charge;
        self.molecular_multiplicity = mult;
        Ok(self)
    }

    /// 从文本块解析分子
    pub fn from_text(text: &str) -> Result<Self> {
        let mut symbols = Vec::new();
        let mut coords = Vec::new();
        let mut charge_mult: Option<(i32, u32)> = None;
        let mut to_bohr = 1.0 / BOHR_TO_ANGSTROM;
        let mut name = None;

        for raw in text.lines() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            let head = parts[0].to_lowercase();

            if head == "units" {
                match parts.get(1).map(|u| u.to_lowercase()).as_deref() {
                    Some("au") | Some("a.u.") | Some("bohr") => to_bohr = 1.0,
                    Some("ang") | Some("angstrom") => to_bohr = 1.0 / BOHR_TO_ANGSTROM,
                    other => {
                        return Err(HarnessError::ParseError {
                            what: "molecule".to_string(),
                            reason: format!("unknown units '{}'", other.unwrap_or("")),
                        })
                    }
                }
                continue;
            }

            if head == "name" {
                name = parts.get(1).map(|s| s.to_string());
                continue;
            }

            // 电荷/多重度行: "0 2"
            if parts.len() == 2 && symbols.is_empty() && charge_mult.is_none() {
                if let (Ok(c), Ok(m)) = (parts[0].parse::<i32>(), parts[1].parse::<u32>()) {
                    charge_mult = Some((c, m));
                    continue;
                }
            }

            if parts.len() != 4 {
                return Err(HarnessError::ParseError {
                    what: "molecule".to_string(),
                    reason: format!("cannot interpret line '{}'", line),
                });
            }

            let xyz: Vec<f64> = parts[1..]
                .iter()
                .map(|s| s.parse::<f64>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| HarnessError::ParseError {
                    what: "molecule".to_string(),
                    reason: format!("bad coordinate in '{}': {}", line, e),
                })?;

            symbols.push(parts[0].to_string());
            coords.push([xyz[0], xyz[1], xyz[2]]);
        }

        let geometry = coords
            .into_iter()
            .map(|[x, y, z]| [x * to_bohr, y * to_bohr, z * to_bohr])
            .collect();

        let mut mol = Molecule::new(symbols, geometry)?;
        mol.name = name;
        match charge_mult {
            Some((c, m)) => mol.with_charge_and_multiplicity(c, Some(m)),
            None => Ok(mol),
        }
    }

    /// 原子数
    pub fn natom(&self) -> usize {
        self.symbols.len()
    }

    /// 核电荷总数
    pub fn nuclear_charge(&self) -> u32 {
        self.symbols
            .iter()
            .filter_map(|s| atomic_number(s))
            .sum()
    }

    /// 分子中出现的元素（有序、去重）
    pub fn unique_elements(&self) -> BTreeSet<&str> {
        self.symbols.iter().map(|s| s.as_str()).collect()
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for sym in &self.symbols {
            *counts.entry(sym.as_str()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// 测试用分子
#[cfg(test)]
pub(crate) mod fixtures {
    pub const H2O: &str = "
 # R=0.958 A=104.5
 H                  0.000000000000     1.431430901356     0.984293362719
 O                  0.000000000000     0.000000000000    -0.124038860300
 H                  0.000000000000    -1.431430901356     0.984293362719
 units au
";

    pub const NH2: &str = "
 # R=1.008 #A=105.0
 0 2
 N   0.000000000000000   0.000000000000000  -0.145912918634892
 H   0.000000000000000  -1.511214298139000   1.013682596946108
 H   0.000000000000000   1.511214298139000   1.013682596946108
 units au
";
}

#[cfg(test)]
mod tests {
    use super::fixtures::{H2O, NH2};
    use super::*;

    #[test]
    fn test_parse_water() {
        let mol = Molecule::from_text(H2O).unwrap();
        assert_eq!(mol.symbols, vec!["H", "O", "H"]);
        assert_eq!(mol.molecular_charge, 0);
        assert_eq!(mol.molecular_multiplicity, 1);
        assert!((mol.geometry[0][1] - 1.431430901356).abs() < 1e-12);
        assert_eq!(mol.formula(), "H2O");
    }

    #[test]
    fn test_parse_radical() {
        let mol = Molecule::from_text(NH2).unwrap();
        assert_eq!(mol.natom(), 3);
        assert_eq!(mol.molecular_multiplicity, 2);
        assert_eq!(mol.nuclear_charge(), 9);
    }

    #[test]
    fn test_angstrom_default_units() {
        let mol = Molecule::from_text("He 0.0 0.0 1.0").unwrap();
        assert!((mol.geometry[0][2] - 1.0 / BOHR_TO_ANGSTROM).abs() < 1e-10);
    }

    #[test]
    fn test_inconsistent_multiplicity() {
        let err = Molecule::from_text("0 1\nN 0 0 0\nH 0 0 1.9\nH 0 1.9 0\nunits au");
        assert!(err.is_err());
    }

    #[test]
    fn test_unknown_element() {
        assert!(Molecule::from_text("Qq 0 0 0").is_err());
    }

    #[test]
    fn test_heavy_elements() {
        let mol = Molecule::from_text("au 0 0 0\nH 0 0 2.9\nunits au").unwrap();
        assert_eq!(mol.symbols, vec!["Au", "H"]);
        assert_eq!(mol.nuclear_charge(), 80);
        assert_eq!(mol.molecular_multiplicity, 1);

        assert_eq!(atomic_number("Pt"), Some(78));
        assert_eq!(atomic_number("Og"), Some(118));
        assert_eq!(normalize_symbol("PB").as_deref(), Some("Pb"));
    }

    #[test]
    fn test_record_json() {
        let json = r#"{"symbols": ["h", "h"], "geometry": [0, 0, 0, 0, 0, 1.4]}"#;
        let mol: Molecule = serde_json::from_str(json).unwrap();
        assert_eq!(mol.symbols, vec!["H", "H"]);
        assert_eq!(mol.geometry[1], [0.0, 0.0, 1.4]);
    }

    #[test]
    fn test_text_json() {
        let json = serde_json::to_string(NH2).unwrap();
        let mol: Molecule = serde_json::from_str(&json).unwrap();
        assert_eq!(mol.molecular_multiplicity, 2);
    }
}
