//! 需要真实 NWChem 的计算，默认忽略：`cargo test -- --ignored`

use nwharness::{CalcRequest, Driver, JobConfig, Keywords, Molecule, NwchemHarness};

const H2O: &str = "
 # R=0.958 A=104.5
 H                  0.000000000000     1.431430901356     0.984293362719
 O                  0.000000000000     0.000000000000    -0.124038860300
 H                  0.000000000000    -1.431430901356     0.984293362719
 units au
";

const NH2: &str = "
 # R=1.008 #A=105.0
 0 2
 N   0.000000000000000   0.000000000000000  -0.145912918634892
 H   0.000000000000000  -1.511214298139000   1.013682596946108
 H   0.000000000000000   1.511214298139000   1.013682596946108
 units au
";

const TOL: f64 = 1.0e-6;

fn energy(mol: &str, method: &str, keywords: &[(&str, &str)]) -> nwharness::Result<f64> {
    let mut kw = Keywords::new().with("basis__spherical", true)?;
    for (key, value) in keywords {
        kw = match *value {
            "true" => kw.with(key, true)?,
            v => match v.parse::<i64>() {
                Ok(n) => kw.with(key, n)?,
                Err(_) => kw.with(key, v)?,
            },
        };
    }
    let request = CalcRequest::new(Molecule::from_text(mol)?, Driver::Energy, method, "aug-cc-pvdz")
        .with_keywords(kw);

    let result = NwchemHarness::new().compute(&request, &JobConfig::default())?;
    assert!(result.success);
    Ok(result.return_result.as_scalar().unwrap_or(f64::NAN))
}

#[test]
#[ignore]
fn water_rhf() {
    let e = energy(H2O, "hf", &[]).unwrap();
    assert!((e + 76.0413815332).abs() < TOL, "{}", e);

    let e = energy(H2O, "hf", &[("qc_module", "tce")]).unwrap();
    assert!((e + 76.0413815332).abs() < TOL, "{}", e);
}

#[test]
#[ignore]
fn nh2_uhf() {
    let e = energy(NH2, "hf", &[("scf__uhf", "true")]).unwrap();
    assert!((e + 55.57513805253009).abs() < TOL, "{}", e);
}

#[test]
#[ignore]
fn nh2_rohf() {
    let e = energy(NH2, "hf", &[("scf__rohf", "true")]).unwrap();
    assert!((e + 55.570724348574).abs() < TOL, "{}", e);
}

#[test]
#[ignore]
fn water_mp2() {
    let e = energy(H2O, "mp2", &[]).unwrap();
    assert!((e + 76.2632792578).abs() < TOL, "{}", e);
}

#[test]
#[ignore]
fn nh2_uhf_mp2_frozen_core() {
    let e = energy(NH2, "mp2", &[("scf__uhf", "true"), ("mp2__freeze", "1")]).unwrap();
    assert!((e + 55.727565606601).abs() < TOL, "{}", e);

    let e = energy(
        NH2,
        "mp2",
        &[("qc_module", "tce"), ("scf__uhf", "true"), ("tce__freeze", "1")],
    )
    .unwrap();
    assert!((e + 55.727565606601).abs() < TOL, "{}", e);
}

#[test]
#[ignore]
fn nh2_rohf_mp2_is_rejected() {
    let err = energy(NH2, "mp2", &[("scf__rohf", "true")]).unwrap_err();
    assert!(err.is_input_error());
    assert!(err.to_string().contains("unknown SCFTYPE"));
}
